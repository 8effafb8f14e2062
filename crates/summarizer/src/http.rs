//! Summarizer backed by a hosted text-generation endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use kycflow_core::KycProfile;

use crate::{MAX_SUMMARY_CHARS, SummaryError, Summarizer, clamp_summary};

const DEFAULT_API_URL: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Endpoint settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub api_url: String,
    pub api_key: String,
}

impl SummarizerConfig {
    /// Returns `None` when `SUMMARIZER_API_KEY` is unset or empty; the
    /// service then runs in fallback-only mode. `SUMMARIZER_API_URL`
    /// overrides the default endpoint.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("SUMMARIZER_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let api_url = std::env::var("SUMMARIZER_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Some(Self { api_url, api_key })
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_length: u32,
    temperature: f32,
}

pub struct HttpSummarizer {
    client: reqwest::Client,
    config: Option<SummarizerConfig>,
}

impl HttpSummarizer {
    pub fn new(config: Option<SummarizerConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn from_env() -> Self {
        let config = SummarizerConfig::from_env();
        if config.is_none() {
            warn!("summarizer not configured, submissions will use the fallback summary");
        }
        Self::new(config)
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, profile: &KycProfile) -> Result<String, SummaryError> {
        let config = self.config.as_ref().ok_or(SummaryError::MissingConfig)?;

        let prompt = build_prompt(profile);
        let request = GenerationRequest {
            inputs: &prompt,
            parameters: GenerationParameters {
                max_length: 200,
                temperature: 0.7,
            },
        };

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SummaryError::Timeout
                } else {
                    SummaryError::Http(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| SummaryError::Malformed(err.to_string()))?;

        let summary = extract_summary(&body)?;
        debug!(chars = summary.chars().count(), "summary generated");
        Ok(summary)
    }
}

fn build_prompt(profile: &KycProfile) -> String {
    format!(
        "Generate a brief, professional summary (maximum {MAX_SUMMARY_CHARS} characters) \
         of this KYC submission:\n\
         Name: {}\n\
         Email: {}\n\
         Phone: {}\n\
         Address: {}\n\
         ID Number: {}\n\
         Date of Birth: {}\n\
         Summary:",
        profile.full_name,
        profile.email,
        profile.phone,
        profile.address,
        profile.id_number,
        profile.date_of_birth.format("%Y-%m-%d"),
    )
}

/// Pull the generated text out of a `[{"generated_text": ...}]` response.
/// Models that echo the prompt back get everything after the final
/// `Summary:` marker.
fn extract_summary(body: &Value) -> Result<String, SummaryError> {
    let generated = body
        .as_array()
        .and_then(|items| items.first())
        .and_then(|item| item.get("generated_text"))
        .and_then(Value::as_str)
        .ok_or_else(|| SummaryError::Malformed("missing generated_text".to_string()))?;

    let tail = match generated.rfind("Summary:") {
        Some(index) => &generated[index + "Summary:".len()..],
        None => generated,
    };

    let summary = clamp_summary(tail);
    if summary.is_empty() {
        return Err(SummaryError::Malformed("empty summary".to_string()));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

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

    #[tokio::test]
    async fn unconfigured_summarizer_fails_before_any_io() {
        let summarizer = HttpSummarizer::new(None);
        let result = summarizer.summarize(&profile()).await;
        assert_eq!(result, Err(SummaryError::MissingConfig));
    }

    #[test]
    fn prompt_carries_every_profile_field() {
        let prompt = build_prompt(&profile());
        for needle in ["Jane Doe", "jane@example.com", "ID123", "1990-04-02"] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn extracts_text_after_echoed_prompt() {
        let body = json!([{
            "generated_text": "Name: Jane\nSummary: Applicant Jane Doe submitted KYC details."
        }]);
        assert_eq!(
            extract_summary(&body).unwrap(),
            "Applicant Jane Doe submitted KYC details."
        );
    }

    #[test]
    fn uses_whole_text_when_no_marker_present() {
        let body = json!([{ "generated_text": "A concise applicant summary." }]);
        assert_eq!(extract_summary(&body).unwrap(), "A concise applicant summary.");
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(extract_summary(&json!({})).is_err());
        assert!(extract_summary(&json!([])).is_err());
        assert!(extract_summary(&json!([{ "generated_text": "Summary:   " }])).is_err());
    }

    #[test]
    fn long_generations_are_clamped() {
        let text = format!("Summary: {}", "a".repeat(1000));
        let body = json!([{ "generated_text": text }]);
        assert_eq!(
            extract_summary(&body).unwrap().chars().count(),
            MAX_SUMMARY_CHARS
        );
    }
}
