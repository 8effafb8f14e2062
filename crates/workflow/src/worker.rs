//! Background PDF worker.
//!
//! Pulls render jobs one at a time, renders the document, writes it to the
//! output directory and records the artifact on the KYC record. The handler
//! returns a [`JobOutcome`] for every path, so each delivery settles exactly
//! once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use kycflow_core::RenderJob;
use kycflow_pdf::render_kyc_document;
use kycflow_queue::{JobConsumer, JobOutcome, QueueError};
use kycflow_store::KycStore;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

pub struct PdfWorker {
    store: Arc<dyn KycStore>,
    consumer: Arc<dyn JobConsumer>,
    output_dir: PathBuf,
}

impl PdfWorker {
    pub fn new(
        store: Arc<dyn KycStore>,
        consumer: Arc<dyn JobConsumer>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            consumer,
            output_dir,
        }
    }

    /// Consume jobs forever. Queue errors are logged and retried after a
    /// short backoff; an idle queue is polled at a fixed interval.
    pub async fn run(&self) {
        info!(output_dir = %self.output_dir.display(), "PDF worker started");
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
                Err(err) => {
                    warn!(error = %err, "queue unreachable, backing off");
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                }
            }
        }
    }

    /// Drain the queue until it reports idle. Test entry point.
    pub async fn run_until_idle(&self) -> Result<(), QueueError> {
        while self.step().await? {}
        Ok(())
    }

    /// Process at most one delivery. Returns whether a job was handled.
    async fn step(&self) -> Result<bool, QueueError> {
        let Some(delivery) = self.consumer.next_job().await? else {
            return Ok(false);
        };
        let outcome = self.handle_job(&delivery.job).await;
        self.consumer.complete(delivery, outcome).await?;
        Ok(true)
    }

    async fn handle_job(&self, job: &RenderJob) -> JobOutcome {
        let record = match self.store.find_by_id(job.kyc_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                // The record this job points at no longer exists; retrying
                // cannot succeed.
                warn!(kyc_id = %job.kyc_id, "render job for unknown record, dropping");
                return JobOutcome::NackDrop;
            }
            Err(err) => {
                error!(kyc_id = %job.kyc_id, error = %err, "store lookup failed");
                return JobOutcome::NackRequeue;
            }
        };

        let generated_at = Utc::now();
        let bytes = match render_kyc_document(&record, generated_at) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(kyc_id = %job.kyc_id, error = %err, "document render failed");
                return JobOutcome::NackRequeue;
            }
        };

        let file_name = format!("KYC_{}_{}.pdf", job.kyc_id, generated_at.timestamp_millis());
        let path = self.output_dir.join(&file_name);
        if let Err(err) = self.write_document(&path, &bytes).await {
            error!(kyc_id = %job.kyc_id, path = %path.display(), error = %err, "document write failed");
            return JobOutcome::NackRequeue;
        }

        match self
            .store
            .set_render_artifact(
                job.kyc_id,
                path.to_string_lossy().into_owned(),
                generated_at,
            )
            .await
        {
            Ok(_) => {
                info!(kyc_id = %job.kyc_id, file = file_name, "document generated");
                JobOutcome::Ack
            }
            Err(err) => {
                error!(kyc_id = %job.kyc_id, error = %err, "artifact update failed");
                JobOutcome::NackRequeue
            }
        }
    }

    async fn write_document(&self, path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(path, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kycflow_core::{KycProfile, KycRecord, KycStatus, UserId};
    use kycflow_queue::{InMemoryJobQueue, JobQueue};
    use kycflow_store::InMemoryKycStore;

    fn approved_record() -> KycRecord {
        let mut record = KycRecord::new(
            UserId::new(),
            KycProfile {
                full_name: "Jane Doe".into(),
                email: "jane@example.com".into(),
                phone: "555".into(),
                address: "1 Main St".into(),
                id_number: "ID123".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            },
            Some("Applicant summary.".into()),
        );
        record.status = KycStatus::Approved;
        record
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("kycflow-worker-{}", uuid::Uuid::now_v7()))
    }

    fn setup() -> (PdfWorker, Arc<InMemoryKycStore>, Arc<InMemoryJobQueue>, PathBuf) {
        let store = Arc::new(InMemoryKycStore::new());
        let queue = Arc::new(InMemoryJobQueue::new("worker-test"));
        let dir = temp_dir();
        let worker = PdfWorker::new(store.clone(), queue.clone(), dir.clone());
        (worker, store, queue, dir)
    }

    #[tokio::test]
    async fn processes_queued_jobs_and_records_artifacts() {
        let (worker, store, queue, dir) = setup();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let record = approved_record();
            ids.push(record.id);
            queue.publish(&RenderJob::for_record(&record)).await.unwrap();
            store.insert(record).await.unwrap();
        }

        worker.run_until_idle().await.unwrap();

        for id in ids {
            let record = store.find_by_id(id).await.unwrap().unwrap();
            let path = record.pdf_path.expect("artifact recorded");
            assert!(path.contains(&format!("KYC_{id}_")));
            let bytes = tokio::fs::read(&path).await.unwrap();
            assert!(bytes.starts_with(b"%PDF-1.4"));
            assert!(record.pdf_generated_at.is_some());
        }
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn job_for_missing_record_is_dropped_not_retried() {
        let (worker, _, queue, _) = setup();
        let record = approved_record();
        queue.publish(&RenderJob::for_record(&record)).await.unwrap();

        worker.run_until_idle().await.unwrap();

        assert_eq!(queue.queued_len(), 0);
        assert!(queue.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn redelivered_job_overwrites_the_artifact() {
        let (worker, store, queue, dir) = setup();
        let record = approved_record();
        let id = record.id;
        store.insert(record.clone()).await.unwrap();

        queue.publish(&RenderJob::for_record(&record)).await.unwrap();
        worker.run_until_idle().await.unwrap();
        let first = store.find_by_id(id).await.unwrap().unwrap();

        queue.publish(&RenderJob::for_record(&record)).await.unwrap();
        worker.run_until_idle().await.unwrap();
        let second = store.find_by_id(id).await.unwrap().unwrap();

        assert!(first.pdf_path.is_some());
        assert!(second.pdf_path.is_some());
        assert!(second.pdf_generated_at >= first.pdf_generated_at);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn idle_queue_reports_clean_drain() {
        let (worker, _, _, _) = setup();
        worker.run_until_idle().await.unwrap();
    }

    #[tokio::test]
    async fn queue_outage_surfaces_as_an_error() {
        let (worker, _, queue, _) = setup();
        queue.set_available(false);
        assert!(worker.run_until_idle().await.is_err());
    }
}
