//! `kycflow-pdf` — pure KYC record to PDF document rendering.
//!
//! [`render_kyc_document`] is a pure transformation used identically by the
//! synchronous admin download path and by the background worker; the only
//! difference between the two is who calls it and how completion is reported.
//! Given the same record and generation timestamp the output bytes are
//! identical.

use chrono::{DateTime, Utc};
use thiserror::Error;

use kycflow_core::KycRecord;

mod writer;

use writer::{Font, PageComposer, assemble_document};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The document content does not fit on a single page (e.g. an
    /// excessively long summary). Reported, never silently truncated.
    #[error("document content exceeds a single page")]
    PageOverflow,
}

/// Render an approved KYC record into PDF bytes.
///
/// `generated_at` is threaded in by the caller rather than read from the
/// clock so the function stays deterministic and testable.
pub fn render_kyc_document(
    record: &KycRecord,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, RenderError> {
    let mut page = PageComposer::new();

    page.text_centered(Font::Bold, 20.0, "KYC Verification Document")?;
    page.text_centered(Font::Regular, 12.0, "Know Your Customer Information")?;
    page.rule()?;
    page.space(8.0)?;

    page.text(Font::Bold, 11.0, "Personal Information")?;
    page.text(Font::Regular, 11.0, &format!("Full Name: {}", record.profile.full_name))?;
    page.text(Font::Regular, 11.0, &format!("Email: {}", record.profile.email))?;
    page.text(Font::Regular, 11.0, &format!("Phone: {}", record.profile.phone))?;
    page.text(Font::Regular, 11.0, &format!("Address: {}", record.profile.address))?;
    page.text(Font::Regular, 11.0, &format!("ID Number: {}", record.profile.id_number))?;
    page.text(
        Font::Regular,
        11.0,
        &format!(
            "Date of Birth: {}",
            record.profile.date_of_birth.format("%B %d, %Y")
        ),
    )?;
    page.space(8.0)?;

    page.text(Font::Bold, 11.0, "Verification Details")?;
    page.text(
        Font::Regular,
        11.0,
        &format!("Status: {}", record.status.as_str().to_uppercase()),
    )?;
    page.text(
        Font::Regular,
        11.0,
        &format!("Verification Date: {}", generated_at.format("%B %d, %Y")),
    )?;
    page.text(Font::Regular, 11.0, &format!("Document ID: {}", record.id))?;

    if let Some(summary) = &record.summary {
        page.space(8.0)?;
        page.text(Font::Bold, 11.0, "Summary")?;
        for line in wrap_text(summary, 95) {
            page.text(Font::Regular, 10.0, &line)?;
        }
    }

    page.space(16.0)?;
    page.rule()?;
    page.text_centered(
        Font::Regular,
        9.0,
        "This document is generated automatically. For verification queries, please contact support.",
    )?;
    page.text_centered(
        Font::Regular,
        9.0,
        &format!("Generated on: {}", generated_at.format("%B %d, %Y %H:%M UTC")),
    )?;

    Ok(assemble_document(&page.finish()))
}

/// Greedy word wrap; words longer than `max_chars` get a line of their own.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kycflow_core::{KycProfile, KycRecord, KycStatus, UserId};

    fn approved_record(summary: Option<&str>) -> KycRecord {
        let mut record = KycRecord::new(
            UserId::new(),
            KycProfile {
                full_name: "Jane Doe".into(),
                email: "jane@example.com".into(),
                phone: "+1 555 0100".into(),
                address: "1 Main St, Springfield".into(),
                id_number: "ID123".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            },
            summary.map(String::from),
        );
        record.status = KycStatus::Approved;
        record
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        String::from_utf8_lossy(haystack).contains(needle)
    }

    #[test]
    fn rendered_document_contains_all_blocks() {
        let record = approved_record(Some("Applicant information submitted for verification."));
        let bytes = render_kyc_document(&record, Utc::now()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(contains(&bytes, "KYC Verification Document"));
        assert!(contains(&bytes, "Full Name: Jane Doe"));
        assert!(contains(&bytes, "Email: jane@example.com"));
        assert!(contains(&bytes, "Date of Birth: April 02, 1990"));
        assert!(contains(&bytes, "Status: APPROVED"));
        assert!(contains(&bytes, &format!("Document ID: {}", record.id)));
        assert!(contains(&bytes, "Applicant information submitted"));
    }

    #[test]
    fn summary_block_is_omitted_when_absent() {
        let record = approved_record(None);
        let bytes = render_kyc_document(&record, Utc::now()).unwrap();
        assert!(!contains(&bytes, "(Summary)"));
    }

    #[test]
    fn same_inputs_render_byte_identical_documents() {
        let record = approved_record(Some("Summary text."));
        let at = Utc::now();
        assert_eq!(
            render_kyc_document(&record, at).unwrap(),
            render_kyc_document(&record, at).unwrap()
        );
    }

    #[test]
    fn different_timestamps_keep_content_blocks_identical() {
        let record = approved_record(Some("Summary text."));
        let first = render_kyc_document(&record, Utc::now()).unwrap();
        let second =
            render_kyc_document(&record, Utc::now() + chrono::Duration::hours(1)).unwrap();

        for needle in [
            "Full Name: Jane Doe",
            "Email: jane@example.com",
            "Status: APPROVED",
            "Summary text.",
        ] {
            assert!(contains(&first, needle));
            assert!(contains(&second, needle));
        }
    }

    #[test]
    fn long_summary_wraps_instead_of_erroring() {
        let summary = "word ".repeat(100);
        let record = approved_record(Some(summary.trim()));
        render_kyc_document(&record, Utc::now()).unwrap();
    }

    #[test]
    fn wrap_text_respects_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }
}
