//! Error types for the Comicsmith pipeline.
//!
//! This crate provides the foundation error types used throughout the Comicsmith workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Segmentation and continuity errors abort a run. Provider errors are local to
//! one panel and are classified through [`RetryableError`] so the generation
//! coordinator can choose between retrying and falling back.
//!
//! # Examples
//!
//! ```
//! use comicsmith_error::{ComicsmithResult, ConfigError};
//!
//! fn load() -> ComicsmithResult<u32> {
//!     Err(ConfigError::new("worker_pool_size must be at least 1"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod continuity;
mod error;
mod pipeline;
mod provider;
mod segmentation;

pub use backend::{BackendError, BackendErrorKind};
pub use config::ConfigError;
pub use continuity::{ContinuityError, ContinuityErrorKind};
pub use error::{ComicsmithError, ComicsmithErrorKind, ComicsmithResult};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use provider::{ProviderError, ProviderErrorKind, RetryableError};
pub use segmentation::{SegmentationError, SegmentationErrorKind};
