//! Provider error taxonomy.
//!
//! The retry policy only ever retries quota-class errors; everything else
//! propagates immediately. Classification therefore lives here, next to
//! the error type, so every call site agrees on what "quota" means.

use thiserror::Error;

/// Markers that identify a quota/rate-limit rejection in an error body.
const QUOTA_MARKERS: &[&str] = &["quota", "resource_exhausted", "rate limit"];

/// Errors from the managed LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Rate limited or quota exceeded; retryable with credential rotation
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Non-quota API rejection
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("Request error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// Misconfiguration (e.g. zero credentials); never retried
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether this error is in the quota/rate-limit class.
    pub fn is_quota(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }

    /// Classify an HTTP failure response into the taxonomy.
    ///
    /// HTTP 429 and bodies carrying a quota marker are quota-class;
    /// everything else is a plain API error.
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 429 || is_quota_message(body) {
            LlmError::RateLimited(summarize(body))
        } else {
            LlmError::Api {
                status,
                message: summarize(body),
            }
        }
    }
}

/// Whether an error body reads as a quota rejection.
pub fn is_quota_message(text: &str) -> bool {
    let lowered = text.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Trim an error body to a log-friendly single line.
fn summarize(body: &str) -> String {
    let line = body.lines().next().unwrap_or_default();
    if line.len() > 200 {
        format!("{}...", &line[..200])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_quota() {
        let err = LlmError::from_response(429, "slow down");
        assert!(err.is_quota());
    }

    #[test]
    fn test_quota_marker_in_body_is_quota() {
        let err = LlmError::from_response(403, "Quota exceeded for metric");
        assert!(err.is_quota());

        let err = LlmError::from_response(400, "RESOURCE_EXHAUSTED: daily limit");
        assert!(err.is_quota());
    }

    #[test]
    fn test_plain_api_error_is_not_quota() {
        let err = LlmError::from_response(500, "internal error");
        assert!(!err.is_quota());
        match err {
            LlmError::Api { status, .. } => assert_eq!(status, 500),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_error_is_not_quota() {
        assert!(!LlmError::Config("no keys".into()).is_quota());
    }

    #[test]
    fn test_is_quota_message_case_insensitive() {
        assert!(is_quota_message("Rate Limit hit"));
        assert!(is_quota_message("resource_exhausted"));
        assert!(!is_quota_message("not found"));
    }
}
