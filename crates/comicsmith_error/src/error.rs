//! Top-level error wrapper types.

use crate::{
    BackendError, ConfigError, ContinuityError, PipelineError, ProviderError, SegmentationError,
};

/// Every error condition a Comicsmith operation can surface.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{ComicsmithError, ConfigError};
///
/// let err: ComicsmithError = ConfigError::new("bad window").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ComicsmithErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Event stream could not be segmented
    #[from(SegmentationError)]
    Segmentation(SegmentationError),
    /// Continuity invariant violated
    #[from(ContinuityError)]
    Continuity(ContinuityError),
    /// Image backend could not be constructed
    #[from(BackendError)]
    Backend(BackendError),
    /// Provider failure surfaced outside the coordinator
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Collaborator failure around the core stages
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Comicsmith error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Comicsmith Error: {}", _0)]
pub struct ComicsmithError(Box<ComicsmithErrorKind>);

impl ComicsmithError {
    /// Create a new error from a kind.
    pub fn new(kind: ComicsmithErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ComicsmithErrorKind {
        &self.0
    }

    /// Whether this error aborts a run (as opposed to a per-panel failure).
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ComicsmithErrorKind::Provider(_))
    }
}

impl<T> From<T> for ComicsmithError
where
    T: Into<ComicsmithErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Comicsmith operations.
pub type ComicsmithResult<T> = std::result::Result<T, ComicsmithError>;
