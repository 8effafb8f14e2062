//! Admin review operations: status decisions and document retrieval.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use kycflow_core::{KycId, KycRecord, KycStatus, RenderJob};
use kycflow_queue::JobQueue;
use kycflow_store::KycStore;

use crate::error::WorkflowError;

/// Result of an admin document request.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// A rendered document exists and its bytes were read back.
    Ready { file_name: String, bytes: Vec<u8> },
    /// No document yet; a render job has been queued.
    Queued,
}

/// Reviews submissions and drives document generation.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn KycStore>,
    queue: Arc<dyn JobQueue>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn KycStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// All submissions, newest first.
    pub async fn list_all(&self) -> Result<Vec<KycRecord>, WorkflowError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get(&self, kyc_id: KycId) -> Result<KycRecord, WorkflowError> {
        self.store
            .find_by_id(kyc_id)
            .await?
            .ok_or(WorkflowError::NotFound)
    }

    /// Decide a pending submission.
    ///
    /// Only terminal targets are accepted. Re-applying the status a record
    /// already has is an idempotent no-op; moving between the two terminal
    /// statuses is rejected. Approval queues a render job best effort: a
    /// publish failure is logged but the decision stands.
    pub async fn set_status(
        &self,
        kyc_id: KycId,
        target: KycStatus,
    ) -> Result<KycRecord, WorkflowError> {
        if !target.is_terminal() {
            return Err(WorkflowError::Validation(
                "status must be 'approved' or 'rejected'".to_string(),
            ));
        }

        let record = self.get(kyc_id).await?;
        if record.status == target {
            return Ok(record);
        }
        if record.status.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                from: record.status.to_string(),
                to: target.to_string(),
            });
        }

        let updated = self.store.set_status(kyc_id, target).await?;
        info!(kyc_id = %kyc_id, status = %target, "KYC status updated");

        if target == KycStatus::Approved {
            if let Err(err) = self.queue.publish(&RenderJob::for_record(&updated)).await {
                warn!(kyc_id = %kyc_id, error = %err, "render job not queued at approval");
            }
        }
        Ok(updated)
    }

    /// Fetch the rendered document for an approved record, or queue a render.
    ///
    /// A stored artifact path whose file is gone on disk falls through to
    /// queueing a fresh render. Publish failures surface as
    /// [`WorkflowError::QueueUnavailable`] so the caller can retry.
    pub async fn download(&self, kyc_id: KycId) -> Result<DownloadOutcome, WorkflowError> {
        let record = self.get(kyc_id).await?;
        if record.status != KycStatus::Approved {
            return Err(WorkflowError::NotApproved);
        }

        if let Some(path) = &record.pdf_path {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let file_name = Path::new(path)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("KYC_{kyc_id}.pdf"));
                    return Ok(DownloadOutcome::Ready { file_name, bytes });
                }
                Err(err) => {
                    warn!(kyc_id = %kyc_id, path = %path, error = %err, "stored document unreadable, re-queueing render");
                }
            }
        }

        self.queue
            .publish(&RenderJob::for_record(&record))
            .await
            .map_err(|err| WorkflowError::QueueUnavailable(err.to_string()))?;
        info!(kyc_id = %kyc_id, "render job queued");
        Ok(DownloadOutcome::Queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kycflow_core::{KycProfile, UserId};
    use kycflow_queue::InMemoryJobQueue;
    use kycflow_store::InMemoryKycStore;

    fn record() -> KycRecord {
        KycRecord::new(
            UserId::new(),
            KycProfile {
                full_name: "Jane Doe".into(),
                email: "jane@example.com".into(),
                phone: "555".into(),
                address: "1 Main St".into(),
                id_number: "ID123".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            },
            Some("summary".into()),
        )
    }

    async fn setup() -> (ReviewService, Arc<InMemoryKycStore>, Arc<InMemoryJobQueue>, KycId) {
        let store = Arc::new(InMemoryKycStore::new());
        let queue = Arc::new(InMemoryJobQueue::new("review-test"));
        let rec = record();
        let id = rec.id;
        store.insert(rec).await.unwrap();
        let service = ReviewService::new(store.clone(), queue.clone());
        (service, store, queue, id)
    }

    #[tokio::test]
    async fn approval_updates_status_and_queues_a_render_job() {
        let (service, _, queue, id) = setup().await;
        let updated = service.set_status(id, KycStatus::Approved).await.unwrap();
        assert_eq!(updated.status, KycStatus::Approved);
        assert_eq!(queue.queued_len(), 1);
    }

    #[tokio::test]
    async fn rejection_does_not_queue_a_render_job() {
        let (service, _, queue, id) = setup().await;
        service.set_status(id, KycStatus::Rejected).await.unwrap();
        assert_eq!(queue.queued_len(), 0);
    }

    #[tokio::test]
    async fn pending_is_not_a_valid_decision() {
        let (service, _, _, id) = setup().await;
        let err = service.set_status(id, KycStatus::Pending).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn repeating_a_decision_is_a_no_op() {
        let (service, _, queue, id) = setup().await;
        service.set_status(id, KycStatus::Approved).await.unwrap();
        let again = service.set_status(id, KycStatus::Approved).await.unwrap();
        assert_eq!(again.status, KycStatus::Approved);
        // only the first decision queued a job
        assert_eq!(queue.queued_len(), 1);
    }

    #[tokio::test]
    async fn crossing_terminal_statuses_is_rejected() {
        let (service, _, _, id) = setup().await;
        service.set_status(id, KycStatus::Rejected).await.unwrap();
        let err = service.set_status(id, KycStatus::Approved).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn decision_on_missing_record_is_not_found() {
        let (service, _, _, _) = setup().await;
        let err = service
            .set_status(KycId::new(), KycStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound));
    }

    #[tokio::test]
    async fn approval_survives_a_publish_failure() {
        let (service, _, queue, id) = setup().await;
        queue.set_available(false);
        let updated = service.set_status(id, KycStatus::Approved).await.unwrap();
        assert_eq!(updated.status, KycStatus::Approved);
        assert_eq!(queue.queued_len(), 0);
    }

    #[tokio::test]
    async fn download_of_unapproved_record_is_rejected() {
        let (service, _, _, id) = setup().await;
        let err = service.download(id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotApproved));
    }

    #[tokio::test]
    async fn download_without_artifact_queues_a_render() {
        let (service, _, queue, id) = setup().await;
        service.set_status(id, KycStatus::Approved).await.unwrap();
        queue.drain();

        let outcome = service.download(id).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::Queued));
        assert_eq!(queue.queued_len(), 1);
    }

    #[tokio::test]
    async fn download_with_queue_down_reports_unavailable() {
        let (service, _, queue, id) = setup().await;
        service.set_status(id, KycStatus::Approved).await.unwrap();
        queue.drain();
        queue.set_available(false);

        let err = service.download(id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::QueueUnavailable(_)));

        queue.set_available(true);
        assert!(matches!(
            service.download(id).await.unwrap(),
            DownloadOutcome::Queued
        ));
    }

    #[tokio::test]
    async fn download_serves_an_existing_artifact() {
        let (service, store, _, id) = setup().await;
        service.set_status(id, KycStatus::Approved).await.unwrap();

        let dir = std::env::temp_dir().join(format!("kycflow-review-{}", uuid::Uuid::now_v7()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join(format!("KYC_{id}_1.pdf"));
        tokio::fs::write(&path, b"%PDF-1.4 test").await.unwrap();
        store
            .set_render_artifact(id, path.to_string_lossy().into_owned(), chrono::Utc::now())
            .await
            .unwrap();

        match service.download(id).await.unwrap() {
            DownloadOutcome::Ready { file_name, bytes } => {
                assert_eq!(file_name, format!("KYC_{id}_1.pdf"));
                assert_eq!(bytes, b"%PDF-1.4 test");
            }
            DownloadOutcome::Queued => panic!("expected a ready document"),
        }
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
