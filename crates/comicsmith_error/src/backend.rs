//! Image backend setup error types.

/// Conditions under which an image backend cannot be constructed.
///
/// These surface while assembling the fallback chain, before any panel is
/// dispatched, so they are fatal rather than retryable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BackendErrorKind {
    /// The environment variable holding the API key is unset
    #[display("Provider '{}' needs an API key in {}, which is not set", provider, env_var)]
    MissingApiKey {
        /// Provider name
        provider: String,
        /// Environment variable that was read
        env_var: String,
    },
    /// The HTTP client for a provider could not be built
    #[display("Provider '{}' could not build its HTTP client: {}", provider, message)]
    ClientBuild {
        /// Provider name
        provider: String,
        /// Underlying client error
        message: String,
    },
}

/// Backend setup error with source location tracking.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{BackendError, BackendErrorKind};
///
/// let err = BackendError::new(BackendErrorKind::MissingApiKey {
///     provider: "openai".to_string(),
///     env_var: "OPENAI_API_KEY".to_string(),
/// });
/// assert!(format!("{}", err).contains("OPENAI_API_KEY"));
/// assert_eq!(err.provider(), "openai");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Backend Error: {} at line {} in {}", kind, line, file)]
pub struct BackendError {
    /// The specific error condition
    pub kind: BackendErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl BackendError {
    /// Create a new BackendError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BackendErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Name of the provider that failed to come up.
    pub fn provider(&self) -> &str {
        match &self.kind {
            BackendErrorKind::MissingApiKey { provider, .. }
            | BackendErrorKind::ClientBuild { provider, .. } => provider,
        }
    }
}
