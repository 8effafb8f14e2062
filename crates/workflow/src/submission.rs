//! Applicant-facing submission operations.

use std::sync::Arc;

use tracing::{info, warn};

use kycflow_core::{KycId, KycProfile, KycRecord, UserId};
use kycflow_store::KycStore;
use kycflow_summarizer::{Summarizer, clamp_summary, fallback_summary};

use crate::error::WorkflowError;

/// Accepts new submissions and serves an applicant's own records.
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn KycStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn KycStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { store, summarizer }
    }

    /// Validate and persist a new submission.
    ///
    /// Summary generation is best effort: any summarizer failure falls back
    /// to a deterministic placeholder and never fails the submission.
    pub async fn submit(
        &self,
        user_id: UserId,
        profile: KycProfile,
    ) -> Result<KycRecord, WorkflowError> {
        profile
            .validate()
            .map_err(|err| WorkflowError::Validation(err.to_string()))?;

        let summary = match self.summarizer.summarize(&profile).await {
            Ok(text) => clamp_summary(&text),
            Err(err) => {
                warn!(error = %err, "summary generation failed, using fallback");
                fallback_summary(&profile)
            }
        };

        let record = KycRecord::new(user_id, profile, Some(summary));
        self.store.insert(record.clone()).await?;
        info!(kyc_id = %record.id, user_id = %user_id, "KYC submission accepted");
        Ok(record)
    }

    /// All submissions owned by `user_id`, newest first.
    pub async fn my_submissions(&self, user_id: UserId) -> Result<Vec<KycRecord>, WorkflowError> {
        Ok(self.store.find_by_user(user_id).await?)
    }

    /// A single submission, only if owned by `user_id`.
    pub async fn get_owned(
        &self,
        user_id: UserId,
        kyc_id: KycId,
    ) -> Result<KycRecord, WorkflowError> {
        let record = self
            .store
            .find_by_id(kyc_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        if !record.is_owned_by(user_id) {
            return Err(WorkflowError::Forbidden);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use kycflow_core::KycStatus;
    use kycflow_store::InMemoryKycStore;
    use kycflow_summarizer::SummaryError;

    struct FixedSummarizer(Result<String, SummaryError>);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _profile: &KycProfile) -> Result<String, SummaryError> {
            self.0.clone()
        }
    }

    fn profile() -> KycProfile {
        KycProfile {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: "+1 555 0100".into(),
            address: "1 Main St".into(),
            id_number: "ID123".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
        }
    }

    fn service(summarizer: FixedSummarizer) -> (SubmissionService, Arc<InMemoryKycStore>) {
        let store = Arc::new(InMemoryKycStore::new());
        let service = SubmissionService::new(store.clone(), Arc::new(summarizer));
        (service, store)
    }

    #[tokio::test]
    async fn submit_persists_a_pending_record_with_summary() {
        let (service, store) =
            service(FixedSummarizer(Ok("Applicant Jane Doe, verified details.".into())));
        let record = service.submit(UserId::new(), profile()).await.unwrap();

        assert_eq!(record.status, KycStatus::Pending);
        assert_eq!(
            record.summary.as_deref(),
            Some("Applicant Jane Doe, verified details.")
        );
        assert!(store.find_by_id(record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn summarizer_failure_falls_back_without_failing_submission() {
        let (service, _) = service(FixedSummarizer(Err(SummaryError::Timeout)));
        let record = service.submit(UserId::new(), profile()).await.unwrap();

        let summary = record.summary.unwrap();
        assert!(summary.contains("Jane Doe"));
        assert!(summary.contains("ID123"));
        assert!(summary.contains("jane@example.com"));
        assert!(summary.contains("pending verification"));
    }

    #[tokio::test]
    async fn oversized_generated_summary_is_clamped() {
        let (service, _) = service(FixedSummarizer(Ok("b".repeat(1000))));
        let record = service.submit(UserId::new(), profile()).await.unwrap();
        assert_eq!(record.summary.unwrap().chars().count(), 300);
    }

    #[tokio::test]
    async fn invalid_profile_is_rejected_before_any_write() {
        let (service, store) = service(FixedSummarizer(Ok("summary".into())));
        let mut bad = profile();
        bad.email = String::new();

        let err = service.submit(UserId::new(), bad).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_owned_enforces_ownership() {
        let (service, _) = service(FixedSummarizer(Ok("summary".into())));
        let owner = UserId::new();
        let record = service.submit(owner, profile()).await.unwrap();

        assert!(service.get_owned(owner, record.id).await.is_ok());
        let err = service.get_owned(UserId::new(), record.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden));
        let err = service.get_owned(owner, KycId::new()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound));
    }
}
