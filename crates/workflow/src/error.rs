//! Workflow-level error taxonomy.

use thiserror::Error;

use kycflow_store::StoreError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Submitted data failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested record does not exist.
    #[error("KYC record not found")]
    NotFound,

    /// The caller may not access this record.
    #[error("access to this KYC record is forbidden")]
    Forbidden,

    /// The record is already in a terminal status different from the target.
    #[error("cannot change status from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Document requested for a record that is not approved.
    #[error("KYC record is not approved")]
    NotApproved,

    /// The job queue rejected a publish; the caller should retry later.
    #[error("document queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
