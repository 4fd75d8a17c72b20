//! Trait definitions for the Comicsmith pipeline.
//!
//! This crate defines the seams between the core stages and their external
//! collaborators: image-generation backends and transcript ingestion.

mod traits;
mod types;

pub use traits::{ImageProvider, TranscriptSource};
pub use types::Transcript;
