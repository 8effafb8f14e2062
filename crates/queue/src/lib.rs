//! `kycflow-queue` — durable render-job queue (at-least-once delivery).
//!
//! One producer (the review service) and one consumer group (the PDF worker)
//! exchange [`RenderJob`] messages through a named queue. Delivery is
//! at-least-once: a message stays pending until the consumer reports an
//! outcome, and transient failures requeue it for another attempt.
//!
//! The worker handler *returns* a [`JobOutcome`] instead of calling ack/nack
//! methods, so every code path through a handler ends in exactly one
//! acknowledgment decision by construction.
//!
//! Implementations:
//! - [`InMemoryJobQueue`]: default wiring and tests.
//! - `RedisJobQueue` (feature `redis`): Redis Streams consumer group
//!   (XADD / XREADGROUP / XACK / XCLAIM) with a dead-letter stream.

use async_trait::async_trait;
use thiserror::Error;

use kycflow_core::RenderJob;

pub mod in_memory;

#[cfg(feature = "redis")]
pub mod redis_streams;

pub use in_memory::InMemoryJobQueue;

#[cfg(feature = "redis")]
pub use redis_streams::RedisJobQueue;

/// Default queue name; overridable through configuration.
pub const DEFAULT_QUEUE_NAME: &str = "pdf_generation_queue";

/// Default number of deliveries before a message is dead-lettered.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker is unreachable (connection lost, or deliberately offline).
    /// Callers must treat this as non-fatal to the surrounding request.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The job payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A broker command failed for a reason other than availability.
    #[error("queue command failed: {0}")]
    Command(String),
}

/// Outcome of handling one delivered job. The consumer loop maps each
/// variant to exactly one acknowledgment action.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Processing succeeded; permanently remove the message.
    Ack,
    /// Recoverable failure; redeliver the message later.
    NackRequeue,
    /// Permanent failure (e.g. record vanished); remove without success.
    NackDrop,
}

/// One delivered message awaiting an outcome.
#[derive(Debug, Clone)]
pub struct JobDelivery {
    pub job: RenderJob,
    /// Broker-assigned id used to settle this delivery.
    pub delivery_id: String,
    /// Number of deliveries so far, including this one.
    pub delivery_count: u32,
}

/// Producer side of the queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Serialize `job` and append it to the durable queue.
    ///
    /// Failures surface as [`QueueError`]; the caller decides whether that is
    /// fatal (for the render trigger it is not — the approval stands).
    async fn publish(&self, job: &RenderJob) -> Result<(), QueueError>;
}

/// Consumer side of the queue (single consumer, one message in flight).
#[async_trait]
pub trait JobConsumer: Send + Sync {
    /// Fetch the next job, or `None` when the queue is idle or a delivery is
    /// already in flight (bounded concurrency of 1).
    async fn next_job(&self) -> Result<Option<JobDelivery>, QueueError>;

    /// Settle a delivery with its outcome.
    async fn complete(&self, delivery: JobDelivery, outcome: JobOutcome) -> Result<(), QueueError>;
}
