//! In-memory job queue used by tests and the default (non-persistent) wiring.
//!
//! Messages are stored as serialized payloads, mirroring what a broker would
//! hold, so publish/consume exercise the same wire contract as the Redis
//! implementation. `set_available(false)` simulates a broker outage: both
//! publish and consume fail fast with [`QueueError::Unavailable`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use kycflow_core::RenderJob;

use crate::{DEFAULT_MAX_RETRIES, JobConsumer, JobDelivery, JobOutcome, JobQueue, QueueError};

#[derive(Debug)]
struct PendingMessage {
    payload: String,
    /// Deliveries so far (0 for a never-delivered message).
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<PendingMessage>,
    /// At most one delivery outstanding (prefetch = 1).
    in_flight: Option<(String, PendingMessage)>,
    dead_letter: Vec<RenderJob>,
}

#[derive(Debug)]
pub struct InMemoryJobQueue {
    name: String,
    state: Mutex<QueueState>,
    available: AtomicBool,
    max_retries: u32,
}

impl InMemoryJobQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            available: AtomicBool::new(true),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Simulate broker connection loss (false) or recovery (true).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn queued_len(&self) -> usize {
        self.state.lock().unwrap().ready.len()
    }

    /// Discard all ready messages.
    pub fn drain(&self) {
        self.state.lock().unwrap().ready.clear();
    }

    /// Jobs dropped after exhausting their retry budget.
    pub fn dead_letters(&self) -> Vec<RenderJob> {
        self.state.lock().unwrap().dead_letter.clone()
    }

    fn ensure_available(&self) -> Result<(), QueueError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::Unavailable(format!(
                "queue '{}' connection lost",
                self.name
            )))
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, job: &RenderJob) -> Result<(), QueueError> {
        self.ensure_available()?;
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        self.state.lock().unwrap().ready.push_back(PendingMessage {
            payload,
            delivery_count: 0,
        });
        Ok(())
    }
}

#[async_trait]
impl JobConsumer for InMemoryJobQueue {
    async fn next_job(&self) -> Result<Option<JobDelivery>, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().unwrap();
        if state.in_flight.is_some() {
            return Ok(None);
        }

        while let Some(mut msg) = state.ready.pop_front() {
            match serde_json::from_str::<RenderJob>(&msg.payload) {
                Ok(job) => {
                    msg.delivery_count += 1;
                    let delivery = JobDelivery {
                        job,
                        delivery_id: Uuid::now_v7().to_string(),
                        delivery_count: msg.delivery_count,
                    };
                    state.in_flight = Some((delivery.delivery_id.clone(), msg));
                    return Ok(Some(delivery));
                }
                Err(e) => {
                    // Poison message: nothing downstream can do better.
                    warn!(queue = %self.name, error = %e, "dropping malformed job payload");
                }
            }
        }

        Ok(None)
    }

    async fn complete(&self, delivery: JobDelivery, outcome: JobOutcome) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        let msg = match state.in_flight.take() {
            Some((id, msg)) if id == delivery.delivery_id => msg,
            other => {
                state.in_flight = other;
                return Err(QueueError::Command(format!(
                    "unknown delivery id {}",
                    delivery.delivery_id
                )));
            }
        };

        match outcome {
            JobOutcome::Ack => {}
            JobOutcome::NackDrop => {
                warn!(queue = %self.name, kyc_id = %delivery.job.kyc_id, "job dropped without success");
            }
            JobOutcome::NackRequeue => {
                if msg.delivery_count >= self.max_retries {
                    warn!(
                        queue = %self.name,
                        kyc_id = %delivery.job.kyc_id,
                        deliveries = msg.delivery_count,
                        "retry budget exhausted, dead-lettering job"
                    );
                    state.dead_letter.push(delivery.job);
                } else {
                    state.ready.push_back(msg);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycflow_core::{KycId, UserId};

    fn job(name: &str) -> RenderJob {
        RenderJob {
            kyc_id: KycId::new(),
            user_id: UserId::new(),
            full_name: name.into(),
            email: format!("{name}@example.com"),
        }
    }

    #[tokio::test]
    async fn publish_then_consume_preserves_order() {
        let queue = InMemoryJobQueue::new("test");
        let first = job("first");
        let second = job("second");
        queue.publish(&first).await.unwrap();
        queue.publish(&second).await.unwrap();

        let d1 = queue.next_job().await.unwrap().unwrap();
        assert_eq!(d1.job, first);
        assert_eq!(d1.delivery_count, 1);
        queue.complete(d1, JobOutcome::Ack).await.unwrap();

        let d2 = queue.next_job().await.unwrap().unwrap();
        assert_eq!(d2.job, second);
        queue.complete(d2, JobOutcome::Ack).await.unwrap();

        assert!(queue.next_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_one_delivery_in_flight_at_a_time() {
        let queue = InMemoryJobQueue::new("test");
        queue.publish(&job("a")).await.unwrap();
        queue.publish(&job("b")).await.unwrap();

        let d = queue.next_job().await.unwrap().unwrap();
        // Second fetch is withheld until the first delivery settles.
        assert!(queue.next_job().await.unwrap().is_none());
        queue.complete(d, JobOutcome::Ack).await.unwrap();
        assert!(queue.next_job().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn nack_requeue_redelivers_with_incremented_count() {
        let queue = InMemoryJobQueue::new("test");
        let j = job("retry");
        queue.publish(&j).await.unwrap();

        let d = queue.next_job().await.unwrap().unwrap();
        assert_eq!(d.delivery_count, 1);
        queue.complete(d, JobOutcome::NackRequeue).await.unwrap();

        let d = queue.next_job().await.unwrap().unwrap();
        assert_eq!(d.job, j);
        assert_eq!(d.delivery_count, 2);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_dead_letters_the_job() {
        let queue = InMemoryJobQueue::new("test").with_max_retries(2);
        let j = job("doomed");
        queue.publish(&j).await.unwrap();

        for _ in 0..2 {
            let d = queue.next_job().await.unwrap().unwrap();
            queue.complete(d, JobOutcome::NackRequeue).await.unwrap();
        }

        assert!(queue.next_job().await.unwrap().is_none());
        assert_eq!(queue.dead_letters(), vec![j]);
    }

    #[tokio::test]
    async fn nack_drop_discards_without_dead_letter() {
        let queue = InMemoryJobQueue::new("test");
        queue.publish(&job("gone")).await.unwrap();

        let d = queue.next_job().await.unwrap().unwrap();
        queue.complete(d, JobOutcome::NackDrop).await.unwrap();

        assert!(queue.next_job().await.unwrap().is_none());
        assert!(queue.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn unavailable_queue_fails_fast_on_both_sides() {
        let queue = InMemoryJobQueue::new("test");
        queue.publish(&job("early")).await.unwrap();
        queue.set_available(false);

        assert!(matches!(
            queue.publish(&job("late")).await,
            Err(QueueError::Unavailable(_))
        ));
        assert!(matches!(
            queue.next_job().await,
            Err(QueueError::Unavailable(_))
        ));

        // Recovery: the previously published message survives the outage.
        queue.set_available(true);
        let d = queue.next_job().await.unwrap().unwrap();
        assert_eq!(d.job.full_name, "early");
    }

    #[tokio::test]
    async fn completing_an_unknown_delivery_is_rejected() {
        let queue = InMemoryJobQueue::new("test");
        queue.publish(&job("a")).await.unwrap();
        let d = queue.next_job().await.unwrap().unwrap();

        let stale = JobDelivery {
            delivery_id: "bogus".into(),
            ..d.clone()
        };
        assert!(matches!(
            queue.complete(stale, JobOutcome::Ack).await,
            Err(QueueError::Command(_))
        ));

        // The real delivery can still be settled.
        queue.complete(d, JobOutcome::Ack).await.unwrap();
    }
}
