//! KYC record model and its status state machine.

use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{KycId, UserId};

/// Review status of a KYC record.
///
/// Initial value is `Pending`; the only legal transitions are
/// `Pending -> Approved` and `Pending -> Rejected`. Both `Approved` and
/// `Rejected` are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    /// Whether this status admits no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, KycStatus::Approved | KycStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl core::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(KycStatus::Pending),
            "approved" => Ok(KycStatus::Approved),
            "rejected" => Ok(KycStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown status '{other}' (expected pending, approved or rejected)"
            ))),
        }
    }
}

/// The applicant-supplied profile fields of a submission.
///
/// All fields are required at creation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycProfile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub id_number: String,
    pub date_of_birth: NaiveDate,
}

impl KycProfile {
    /// Check that every required field carries a non-empty value.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("idNumber", &self.id_number),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{name} is required")));
            }
        }
        Ok(())
    }
}

/// A single KYC submission with its profile data, status and optional
/// render artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub id: KycId,
    pub user_id: UserId,
    pub profile: KycProfile,

    /// Descriptive summary produced at submission time (generated or
    /// fallback). Set at most once, never overwritten later.
    pub summary: Option<String>,

    pub status: KycStatus,

    /// Location of the rendered document, absent until a worker succeeds.
    /// Written together with `pdf_generated_at`; overwriting with a fresh
    /// artifact is allowed (last write wins).
    pub pdf_path: Option<String>,
    pub pdf_generated_at: Option<DateTime<Utc>>,

    pub submitted_at: DateTime<Utc>,
}

impl KycRecord {
    /// Create a freshly-submitted record in `Pending` status.
    pub fn new(user_id: UserId, profile: KycProfile, summary: Option<String>) -> Self {
        Self {
            id: KycId::new(),
            user_id,
            profile,
            summary,
            status: KycStatus::Pending,
            pdf_path: None,
            pdf_generated_at: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
