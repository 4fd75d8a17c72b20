//! Pipeline orchestration error types.

/// Failures of the collaborators surrounding the core stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PipelineErrorKind {
    /// The transcript source could not supply events
    #[display("Ingestion failed: {}", _0)]
    Ingestion(String),
    /// A panel references a character missing from the cast
    #[display("Panel {} references unknown character '{}'", panel, character)]
    MissingCharacter {
        /// Panel id
        panel: String,
        /// Character id
        character: String,
    },
    /// The report writer rejected the finished mission
    #[display("Report writer failed: {}", _0)]
    Report(String),
}

/// Pipeline error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
