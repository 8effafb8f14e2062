//! Render job message published to the job queue.

use serde::{Deserialize, Serialize};

use crate::id::{KycId, UserId};
use crate::kyc::KycRecord;

/// Minimal projection of a KYC record needed to trigger a background render.
///
/// The record store remains the durable source of truth for render status;
/// this message only names the record and carries enough context for logging.
/// Wire format is camelCase JSON: `{"kycId", "userId", "fullName", "email"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub kyc_id: KycId,
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
}

impl RenderJob {
    pub fn for_record(record: &KycRecord) -> Self {
        Self {
            kyc_id: record.id,
            user_id: record.user_id,
            full_name: record.profile.full_name.clone(),
            email: record.profile.email.clone(),
        }
    }
}
