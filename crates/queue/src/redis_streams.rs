//! Redis Streams-backed job queue (enabled with the `redis` feature).
//!
//! Durable at-least-once delivery:
//! - `XADD` appends jobs to a persistent stream (survives broker restart with
//!   Redis persistence enabled).
//! - A single consumer group reads with `XREADGROUP`; unacknowledged entries
//!   stay in the pending list and are reclaimed with `XCLAIM` once their idle
//!   time exceeds the redelivery timeout.
//! - `XACK` settles a delivery; jobs that exhaust the retry budget move to a
//!   dead-letter stream.
//!
//! The redis client is synchronous; async trait methods run the blocking
//! commands on the tokio blocking pool.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use kycflow_core::RenderJob;

use crate::{
    DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_NAME, JobConsumer, JobDelivery, JobOutcome, JobQueue,
    QueueError,
};

const CONSUMER_GROUP: &str = "pdf.worker";

/// Pending entries idle longer than this are eligible for redelivery.
const DEFAULT_PENDING_TIMEOUT_MS: u64 = 60_000;

/// Blocking read timeout for XREADGROUP.
const READ_BLOCK_MS: u64 = 5_000;

/// Bound on establishing a broker connection; a half-open broker must fail
/// the caller instead of holding it for the OS TCP timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Socket read/write bound. Longer than READ_BLOCK_MS so server-side
/// blocking reads return normally.
const IO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RedisJobQueue {
    client: Arc<redis::Client>,
    stream_key: String,
    dlq_key: String,
    consumer_name: String,
    max_retries: u32,
    pending_timeout_ms: u64,
    /// Delivery currently awaiting an outcome (prefetch = 1).
    in_flight: Arc<Mutex<Option<String>>>,
}

impl RedisJobQueue {
    pub fn new(redis_url: impl AsRef<str>, queue_name: Option<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        let stream_key = queue_name.unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string());
        let dlq_key = format!("{stream_key}:dlq");

        let queue = Self {
            client: Arc::new(client),
            stream_key,
            dlq_key,
            consumer_name: format!("worker-{}", uuid::Uuid::now_v7()),
            max_retries: DEFAULT_MAX_RETRIES,
            pending_timeout_ms: DEFAULT_PENDING_TIMEOUT_MS,
            in_flight: Arc::new(Mutex::new(None)),
        };
        queue.ensure_consumer_group()?;
        Ok(queue)
    }

    fn conn(&self) -> Result<redis::Connection, QueueError> {
        let conn = self
            .client
            .get_connection_with_timeout(CONNECT_TIMEOUT)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        conn.set_read_timeout(Some(IO_TIMEOUT))
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        conn.set_write_timeout(Some(IO_TIMEOUT))
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(conn)
    }

    /// Create the consumer group (idempotent; BUSYGROUP errors are ignored).
    fn ensure_consumer_group(&self) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let _: Result<String, _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(CONSUMER_GROUP)
            .arg("0")
            .arg("MKSTREAM")
            .query(&mut conn);
        Ok(())
    }

    fn publish_sync(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("payload")
            .arg(payload)
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("XADD failed: {e}")))?;
        Ok(())
    }

    fn ack_sync(&self, message_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(CONSUMER_GROUP)
            .arg(message_id)
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("XACK failed: {e}")))?;
        Ok(())
    }

    fn dead_letter_sync(
        &self,
        payload: &str,
        message_id: &str,
        delivery_count: u32,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("XADD")
            .arg(&self.dlq_key)
            .arg("*")
            .arg("original_message_id")
            .arg(message_id)
            .arg("delivery_count")
            .arg(delivery_count.to_string())
            .arg("failed_at")
            .arg(chrono::Utc::now().to_rfc3339())
            .arg("payload")
            .arg(payload)
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("DLQ XADD failed: {e}")))?;

        warn!(
            message_id = %message_id,
            delivery_count = delivery_count,
            "job moved to dead-letter stream"
        );
        Ok(())
    }

    /// Reclaim one stale pending entry for this consumer, if any.
    fn claim_stale_sync(&self) -> Result<Option<(String, String, u32)>, QueueError> {
        let mut conn = self.conn()?;

        let pending: Vec<(String, String, u64, u64)> = match redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(CONSUMER_GROUP)
            .arg("IDLE")
            .arg(self.pending_timeout_ms.to_string())
            .arg("-")
            .arg("+")
            .arg("1")
            .query(&mut conn)
        {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };

        let Some((message_id, _consumer, _idle, deliveries)) = pending.into_iter().next() else {
            return Ok(None);
        };

        let claimed: Vec<redis::Value> = redis::cmd("XCLAIM")
            .arg(&self.stream_key)
            .arg(CONSUMER_GROUP)
            .arg(&self.consumer_name)
            .arg(self.pending_timeout_ms.to_string())
            .arg(&message_id)
            .query(&mut conn)
            .map_err(|e| QueueError::Command(format!("XCLAIM failed: {e}")))?;

        for entry in claimed {
            if let Some((id, payload)) = parse_stream_entry(&entry) {
                return Ok(Some((id, payload, deliveries as u32)));
            }
        }
        Ok(None)
    }

    /// Read one new entry for this consumer (blocking up to READ_BLOCK_MS).
    fn read_new_sync(&self) -> Result<Option<(String, String)>, QueueError> {
        use std::collections::HashMap;

        let mut conn = self.conn()?;
        let result: redis::RedisResult<HashMap<String, Vec<redis::Value>>> =
            redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(CONSUMER_GROUP)
                .arg(&self.consumer_name)
                .arg("COUNT")
                .arg("1")
                .arg("BLOCK")
                .arg(READ_BLOCK_MS.to_string())
                .arg("STREAMS")
                .arg(&self.stream_key)
                .arg(">")
                .query(&mut conn);

        let stream_data = match result {
            Ok(data) => data,
            // Nil reply on blocking timeout: no new messages.
            Err(e) if e.kind() == redis::ErrorKind::TypeError => return Ok(None),
            Err(e) => return Err(QueueError::Command(format!("XREADGROUP failed: {e}"))),
        };

        let entries = stream_data.get(&self.stream_key).cloned().unwrap_or_default();
        for entry in entries {
            if let Some(parsed) = parse_stream_entry(&entry) {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }

    fn next_job_sync(&self) -> Result<Option<JobDelivery>, QueueError> {
        {
            let in_flight = self.in_flight.lock().unwrap();
            if in_flight.is_some() {
                return Ok(None);
            }
        }

        // Redeliveries first, then fresh messages.
        let fetched = match self.claim_stale_sync()? {
            Some((id, payload, deliveries)) => Some((id, payload, deliveries + 1)),
            None => self.read_new_sync()?.map(|(id, payload)| (id, payload, 1)),
        };

        let Some((message_id, payload, delivery_count)) = fetched else {
            return Ok(None);
        };

        let job: RenderJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(e) => {
                // Poison message: settle it so it cannot wedge the queue.
                warn!(message_id = %message_id, error = %e, "dropping malformed job payload");
                self.ack_sync(&message_id)?;
                return Ok(None);
            }
        };

        *self.in_flight.lock().unwrap() = Some(message_id.clone());
        Ok(Some(JobDelivery {
            job,
            delivery_id: message_id,
            delivery_count,
        }))
    }

    fn complete_sync(&self, delivery: JobDelivery, outcome: JobOutcome) -> Result<(), QueueError> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.take() {
                Some(id) if id == delivery.delivery_id => {}
                other => {
                    *in_flight = other;
                    return Err(QueueError::Command(format!(
                        "unknown delivery id {}",
                        delivery.delivery_id
                    )));
                }
            }
        }

        match outcome {
            JobOutcome::Ack => self.ack_sync(&delivery.delivery_id),
            JobOutcome::NackDrop => {
                warn!(kyc_id = %delivery.job.kyc_id, "job dropped without success");
                self.ack_sync(&delivery.delivery_id)
            }
            JobOutcome::NackRequeue => {
                if delivery.delivery_count >= self.max_retries {
                    let payload = serde_json::to_string(&delivery.job)
                        .map_err(|e| QueueError::Serialization(e.to_string()))?;
                    self.dead_letter_sync(
                        &payload,
                        &delivery.delivery_id,
                        delivery.delivery_count,
                    )?;
                    self.ack_sync(&delivery.delivery_id)
                } else {
                    // Leave the entry pending; XCLAIM redelivers it once the
                    // idle timeout passes.
                    Ok(())
                }
            }
        }
    }
}

/// Parse a stream entry `[message_id, [field, value, ...]]` into
/// `(message_id, payload)`.
fn parse_stream_entry(entry: &redis::Value) -> Option<(String, String)> {
    let redis::Value::Bulk(parts) = entry else {
        return None;
    };
    let id = match parts.first()? {
        redis::Value::Data(data) => String::from_utf8_lossy(data).to_string(),
        _ => return None,
    };
    let redis::Value::Bulk(fields) = parts.get(1)? else {
        return None;
    };
    for chunk in fields.chunks(2) {
        if let [redis::Value::Data(key), redis::Value::Data(value)] = chunk {
            if key.as_slice() == b"payload" {
                return Some((id, String::from_utf8_lossy(value).to_string()));
            }
        }
    }
    None
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn publish(&self, job: &RenderJob) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.publish_sync(&payload))
            .await
            .map_err(|e| QueueError::Command(format!("publish task failed: {e}")))?
    }
}

#[async_trait]
impl JobConsumer for RedisJobQueue {
    async fn next_job(&self) -> Result<Option<JobDelivery>, QueueError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.next_job_sync())
            .await
            .map_err(|e| QueueError::Command(format!("consume task failed: {e}")))?
    }

    async fn complete(&self, delivery: JobDelivery, outcome: JobOutcome) -> Result<(), QueueError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.complete_sync(delivery, outcome))
            .await
            .map_err(|e| QueueError::Command(format!("complete task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn unreachable_broker_fails_within_the_connect_bound() {
        let started = Instant::now();
        let result = RedisJobQueue::new("redis://127.0.0.1:1", None);
        assert!(matches!(result, Err(QueueError::Unavailable(_))));
        assert!(started.elapsed() < CONNECT_TIMEOUT + Duration::from_secs(2));
    }
}
