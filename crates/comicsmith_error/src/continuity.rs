//! Continuity tracker error types.

/// Invariant violations raised by the continuity tracker.
///
/// Any of these signals a pipeline bug rather than external flakiness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ContinuityErrorKind {
    /// A commit arrived for a panel earlier than one already committed
    #[display(
        "Out-of-order commit for '{}': panel {} arrived after panel {}",
        character,
        attempted,
        last_committed
    )]
    OutOfOrderCommit {
        /// Character the commit targeted
        character: String,
        /// Most recent panel already committed for the character
        last_committed: String,
        /// Panel of the rejected commit
        attempted: String,
    },
    /// The character is not part of the mission cast
    #[display("Unknown character '{}'", _0)]
    UnknownCharacter(String),
}

/// Continuity error with source location tracking.
///
/// # Examples
///
/// ```
/// use comicsmith_error::{ContinuityError, ContinuityErrorKind};
///
/// let err = ContinuityError::new(ContinuityErrorKind::UnknownCharacter("vex".into()));
/// assert!(format!("{}", err).contains("vex"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Continuity Error: {} at line {} in {}", kind, line, file)]
pub struct ContinuityError {
    /// The specific error condition
    pub kind: ContinuityErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ContinuityError {
    /// Create a new ContinuityError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ContinuityErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
