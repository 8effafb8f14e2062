//! `kycflow-summarizer` — best-effort descriptive summary generation.
//!
//! Calls an external text-generation endpoint with a bounded timeout and a
//! fixed prompt template. Every failure mode is a typed [`SummaryError`];
//! recovering with [`fallback_summary`] is an explicit step at the call site
//! (the submission service), never hidden inside this crate. A summarizer
//! failure must never block submission success.

use async_trait::async_trait;
use thiserror::Error;

use kycflow_core::KycProfile;

pub mod http;

pub use http::{HttpSummarizer, SummarizerConfig};

/// Upper bound on generated summary length, in characters.
pub const MAX_SUMMARY_CHARS: usize = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummaryError {
    /// No endpoint/API key configured; checked before any I/O.
    #[error("summarizer is not configured")]
    MissingConfig,

    /// The request timed out.
    #[error("summarizer request timed out")]
    Timeout,

    /// Transport-level failure (DNS, connection, TLS).
    #[error("summarizer request failed: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status.
    #[error("summarizer returned status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("malformed summarizer response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a short descriptive summary for a submission's profile fields.
    async fn summarize(&self, profile: &KycProfile) -> Result<String, SummaryError>;
}

/// Deterministic placeholder used when the external summarizer is
/// unavailable, unconfigured or fails.
pub fn fallback_summary(profile: &KycProfile) -> String {
    format!(
        "KYC submission for {} (ID {}, {}) received and pending verification.",
        profile.full_name, profile.id_number, profile.email
    )
}

/// Trim and truncate a generated summary to [`MAX_SUMMARY_CHARS`].
pub fn clamp_summary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_SUMMARY_CHARS {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(MAX_SUMMARY_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn profile() -> KycProfile {
        KycProfile {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: "555".into(),
            address: "1 Main St".into(),
            id_number: "ID123".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
        }
    }

    #[test]
    fn fallback_names_applicant_id_and_email() {
        let text = fallback_summary(&profile());
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("ID123"));
        assert!(text.contains("jane@example.com"));
    }

    #[test]
    fn clamp_trims_and_bounds_length() {
        assert_eq!(clamp_summary("  short  "), "short");
        let long = "x".repeat(500);
        assert_eq!(clamp_summary(&long).chars().count(), MAX_SUMMARY_CHARS);
    }
}
