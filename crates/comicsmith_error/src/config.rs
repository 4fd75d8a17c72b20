//! Configuration error types.

use std::fmt;

/// Configuration that could not be loaded or that holds an unusable value.
///
/// Errors raised while validating a single setting carry its dotted path in
/// `setting` (for example `planner.cast_window`), so callers can point the
/// user at the offending line of their TOML file. Load and parse failures
/// have no setting.
#[derive(Debug, Clone, derive_more::Error)]
pub struct ConfigError {
    /// Dotted path of the offending setting, when one is known
    pub setting: Option<String>,
    /// What is wrong with the configuration
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a ConfigError that is not tied to a single setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use comicsmith_error::ConfigError;
    ///
    /// let err = ConfigError::new("Failed to parse configuration: expected a table");
    /// assert!(err.setting.is_none());
    /// assert!(err.to_string().starts_with("Configuration Error: Failed to parse"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            setting: None,
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create a ConfigError rejecting the value of one setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use comicsmith_error::ConfigError;
    ///
    /// let err = ConfigError::invalid("planner.cast_window", "must be at least 1");
    /// assert_eq!(err.setting.as_deref(), Some("planner.cast_window"));
    /// assert!(err
    ///     .to_string()
    ///     .starts_with("Configuration Error: planner.cast_window must be at least 1"));
    /// ```
    #[track_caller]
    pub fn invalid(setting: impl Into<String>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            setting: Some(setting.into()),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.setting {
            Some(setting) => write!(
                f,
                "Configuration Error: {} {} at line {} in {}",
                setting, self.message, self.line, self.file
            ),
            None => write!(
                f,
                "Configuration Error: {} at line {} in {}",
                self.message, self.line, self.file
            ),
        }
    }
}
