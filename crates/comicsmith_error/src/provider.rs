//! Image provider errors and retry classification.

use std::time::Duration;

/// Error conditions reported by an image-generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The call did not complete in time
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// The provider's quota was exceeded (HTTP 429)
    #[display("Rate limited by provider (retry after {:?})", retry_after)]
    RateLimited {
        /// Server-suggested wait, when supplied
        retry_after: Option<Duration>,
    },
    /// The provider failed on its side (HTTP 5xx)
    #[display("HTTP {} error: {}", status_code, message)]
    Server {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Connection-level failure before a response arrived
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// The request was malformed or unsupported
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// The prompt was rejected by the provider's content policy
    #[display("Content policy rejection: {}", _0)]
    ContentPolicy(String),
    /// Credentials missing or refused
    #[display("Authentication failed: {}", _0)]
    Authentication(String),
    /// The provider answered but the payload was unusable
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
}

impl ProviderErrorKind {
    /// Classify an HTTP status code returned by a provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use comicsmith_error::ProviderErrorKind;
    ///
    /// let kind = ProviderErrorKind::from_status(503, "overloaded", None);
    /// assert!(kind.is_transient());
    ///
    /// let kind = ProviderErrorKind::from_status(400, "bad size", None);
    /// assert!(!kind.is_transient());
    /// ```
    pub fn from_status(
        status_code: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = message.into();
        match status_code {
            408 => ProviderErrorKind::Timeout(message),
            429 => ProviderErrorKind::RateLimited { retry_after },
            401 | 403 => ProviderErrorKind::Authentication(message),
            500..=599 => ProviderErrorKind::Server {
                status_code,
                message,
            },
            _ => ProviderErrorKind::InvalidRequest(format!("HTTP {}: {}", status_code, message)),
        }
    }

    /// Whether retrying the same provider may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Timeout(_)
                | ProviderErrorKind::RateLimited { .. }
                | ProviderErrorKind::Server { .. }
                | ProviderErrorKind::Transport(_)
        )
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Server {
///     status_code: 502,
///     message: "bad gateway".to_string(),
/// });
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors (timeouts, rate limits, 5xx, dropped connections) are
/// retried against the same provider; anything else moves straight on to the
/// next provider in the fallback chain.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Minimum wait requested by the provider before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ProviderErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
