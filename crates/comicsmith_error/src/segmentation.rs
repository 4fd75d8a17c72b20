//! Segmentation error types.

/// Conditions under which an event stream cannot be segmented.
///
/// These are fatal to a run and are always raised before any generation
/// work is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SegmentationErrorKind {
    /// The stream had events, but none survived filtering
    #[display("Event stream is empty after filtering {} events", _0)]
    EmptyAfterFilter(usize),
    /// Two events share an identifier
    #[display("Duplicate event id '{}'", _0)]
    DuplicateEventId(String),
    /// A scene does not start where the previous one ended
    #[display("Scene {} starts at event {} but the previous scene ended at {}", scene, start, expected)]
    NonContiguousScene {
        /// Scene ordinal
        scene: u32,
        /// Actual start index
        start: usize,
        /// Expected start index
        expected: usize,
    },
    /// The scenes do not cover the whole stream
    #[display("Scenes cover {} of {} events", covered, total)]
    IncompleteCoverage {
        /// Number of events covered by scenes
        covered: usize,
        /// Number of events in the stream
        total: usize,
    },
    /// A scene or panel covers no events
    #[display("{} covers no events", _0)]
    EmptyRange(String),
    /// A panel range escapes or fails to partition its scene
    #[display("Panels of scene {} do not partition its events: {}", scene, message)]
    PanelPartition {
        /// Scene ordinal
        scene: u32,
        /// Description of the violation
        message: String,
    },
    /// A location marker pattern failed to compile
    #[display("Invalid location marker pattern '{}': {}", pattern, message)]
    InvalidMarker {
        /// The offending pattern
        pattern: String,
        /// Regex compiler message
        message: String,
    },
}

/// Segmentation error with source location tracking.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{SegmentationError, SegmentationErrorKind};
///
/// let err = SegmentationError::new(SegmentationErrorKind::EmptyAfterFilter(12));
/// assert!(format!("{}", err).contains("empty after filtering"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Segmentation Error: {} at line {} in {}", kind, line, file)]
pub struct SegmentationError {
    /// The specific error condition
    pub kind: SegmentationErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl SegmentationError {
    /// Create a new SegmentationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SegmentationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
