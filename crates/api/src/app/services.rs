//! Infrastructure wiring: stores, queue, summarizer, workflow services.
//!
//! Default wiring is fully in-memory; the `persistent` feature swaps in
//! Postgres for records/accounts and Redis Streams for the job queue.

use std::path::PathBuf;
use std::sync::Arc;

use kycflow_queue::{InMemoryJobQueue, DEFAULT_QUEUE_NAME};
use kycflow_store::{InMemoryKycStore, InMemoryUserStore, UserStore};
use kycflow_summarizer::HttpSummarizer;
use kycflow_workflow::{PdfWorker, ReviewService, SubmissionService};

#[cfg(feature = "persistent")]
use kycflow_queue::RedisJobQueue;
#[cfg(feature = "persistent")]
use kycflow_store::{PostgresKycStore, PostgresUserStore};

/// Services shared by all HTTP handlers.
pub struct AppServices {
    pub submissions: SubmissionService,
    pub review: ReviewService,
    pub users: Arc<dyn UserStore>,
}

/// In-memory wiring plus handles the black-box tests need to reach behind
/// the trait objects (queue control, record store).
pub struct InMemoryWiring {
    pub services: Arc<AppServices>,
    pub kyc_store: Arc<InMemoryKycStore>,
    pub queue: Arc<InMemoryJobQueue>,
    pub worker: PdfWorker,
}

pub fn build_in_memory(output_dir: PathBuf) -> InMemoryWiring {
    let kyc_store = Arc::new(InMemoryKycStore::new());
    let queue = Arc::new(InMemoryJobQueue::new(DEFAULT_QUEUE_NAME));
    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let summarizer = Arc::new(HttpSummarizer::from_env());

    let submissions = SubmissionService::new(kyc_store.clone(), summarizer);
    let review = ReviewService::new(kyc_store.clone(), queue.clone());
    let worker = PdfWorker::new(kyc_store.clone(), queue.clone(), output_dir);

    InMemoryWiring {
        services: Arc::new(AppServices {
            submissions,
            review,
            users,
        }),
        kyc_store,
        queue,
        worker,
    }
}

/// Persistent wiring: Postgres-backed stores and a Redis Streams queue.
///
/// Reads `DATABASE_URL` and `REDIS_URL` from the environment and creates the
/// schema on startup if missing.
#[cfg(feature = "persistent")]
pub async fn build_persistent(output_dir: PathBuf) -> anyhow::Result<(Arc<AppServices>, PdfWorker)> {
    let database_url = std::env::var("DATABASE_URL")?;
    let pool = sqlx::PgPool::connect(&database_url).await?;

    let kyc_store = Arc::new(PostgresKycStore::new(pool.clone()));
    kyc_store.ensure_schema().await?;
    let user_store = Arc::new(PostgresUserStore::new(pool));
    user_store.ensure_schema().await?;

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let queue_name = std::env::var("PDF_QUEUE").ok();
    let queue = Arc::new(RedisJobQueue::new(&redis_url, queue_name)?);

    let summarizer = Arc::new(HttpSummarizer::from_env());
    let submissions = SubmissionService::new(kyc_store.clone(), summarizer);
    let review = ReviewService::new(kyc_store.clone(), queue.clone());
    let worker = PdfWorker::new(kyc_store, queue, output_dir);

    Ok((
        Arc::new(AppServices {
            submissions,
            review,
            users: user_store,
        }),
        worker,
    ))
}
