//! KYC record store: trait + in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kycflow_core::{KycId, KycRecord, KycStatus, UserId};

use crate::error::StoreError;

/// Read/write access to KYC records.
///
/// Updates are atomic per record; there are no multi-record transactions.
#[async_trait]
pub trait KycStore: Send + Sync {
    async fn insert(&self, record: KycRecord) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: KycId) -> Result<Option<KycRecord>, StoreError>;

    /// All records owned by `user_id`, newest submission first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<KycRecord>, StoreError>;

    /// All records, newest submission first (admin listing).
    async fn find_all(&self) -> Result<Vec<KycRecord>, StoreError>;

    /// Overwrite the record's status. Pure value update; transition rules are
    /// enforced by the review service, not here.
    async fn set_status(&self, id: KycId, status: KycStatus) -> Result<KycRecord, StoreError>;

    /// Record the rendered artifact location and generation time.
    ///
    /// Idempotent in the last-write-wins sense: a redelivered job may overwrite
    /// a previously stored artifact reference.
    async fn set_render_artifact(
        &self,
        id: KycId,
        pdf_path: String,
        generated_at: DateTime<Utc>,
    ) -> Result<KycRecord, StoreError>;
}

/// In-memory store used by tests and the default (non-persistent) wiring.
#[derive(Debug, Default)]
pub struct InMemoryKycStore {
    records: Mutex<HashMap<KycId, KycRecord>>,
}

impl InMemoryKycStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut records: Vec<KycRecord>) -> Vec<KycRecord> {
    records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    records
}

#[async_trait]
impl KycStore for InMemoryKycStore {
    async fn insert(&self, record: KycRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: KycId) -> Result<Option<KycRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<KycRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    async fn find_all(&self) -> Result<Vec<KycRecord>, StoreError> {
        let records = self.records.lock().unwrap().values().cloned().collect();
        Ok(newest_first(records))
    }

    async fn set_status(&self, id: KycId, status: KycStatus) -> Result<KycRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    async fn set_render_artifact(
        &self,
        id: KycId,
        pdf_path: String,
        generated_at: DateTime<Utc>,
    ) -> Result<KycRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.pdf_path = Some(pdf_path);
        record.pdf_generated_at = Some(generated_at);
        Ok(record.clone())
    }
}
