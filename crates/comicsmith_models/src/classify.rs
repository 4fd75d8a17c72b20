//! HTTP failure classification shared by the provider clients.

use comicsmith_error::{ProviderError, ProviderErrorKind};
use std::time::Duration;

const CONTENT_POLICY_MARKERS: &[&str] = &[
    "content_policy",
    "content policy",
    "safety system",
    "content_filtered",
    "invalid_prompts",
];

/// Parse a `Retry-After` header value given in seconds.
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

/// Classify a non-success HTTP response.
///
/// Content-policy rejections are recognized from the response body because
/// providers report them as plain 400s.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{ProviderErrorKind, RetryableError};
/// use comicsmith_models::classify_status;
///
/// let err = classify_status(429, Some("7"), "slow down");
/// assert!(err.is_retryable());
/// assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(7)));
///
/// let err = classify_status(400, None, r#"{"error":{"code":"content_policy_violation"}}"#);
/// assert!(matches!(err.kind, ProviderErrorKind::ContentPolicy(_)));
/// ```
#[track_caller]
pub fn classify_status(status: u16, retry_after: Option<&str>, body: &str) -> ProviderError {
    let lowered = body.to_lowercase();
    if (400..500).contains(&status)
        && CONTENT_POLICY_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
    {
        return ProviderError::new(ProviderErrorKind::ContentPolicy(body.to_string()));
    }

    let retry_after = retry_after.and_then(parse_retry_after);
    ProviderError::new(ProviderErrorKind::from_status(status, body, retry_after))
}

/// Classify a failure that happened before a response arrived.
#[track_caller]
pub fn classify_transport(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout(error.to_string()))
    } else if error.is_builder() {
        ProviderError::new(ProviderErrorKind::InvalidRequest(error.to_string()))
    } else {
        ProviderError::new(ProviderErrorKind::Transport(error.to_string()))
    }
}
