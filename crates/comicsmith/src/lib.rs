//! Comicsmith - role-play transcripts to comic pages
//!
//! Comicsmith reads a transcript of a role-play session (a cast of characters
//! plus timestamped events), cuts it into scenes and panels, keeps each
//! character's appearance consistent from panel to panel, renders every panel
//! through a chain of image providers and packs the results onto pages.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use comicsmith::{
//!     ComicPipeline, ComicsmithConfig, JsonTranscriptSource, RunCancellation,
//!     build_fallback_chain,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ComicsmithConfig::load()?;
//! let chain = build_fallback_chain(&config)?;
//! let pipeline = ComicPipeline::new(config, chain)?;
//!
//! let source = JsonTranscriptSource::new("session.json");
//! let mission = pipeline.run_source(&source, &RunCancellation::new()).await?;
//! println!("{}", mission.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Cargo Features
//!
//! - `openai` - OpenAI image generation backend (default)
//! - `stability` - Stability text-to-image backend (default)
//!
//! # Architecture
//!
//! - `comicsmith_error` - Error types
//! - `comicsmith_core` - Events, scenes, panels, pages and results
//! - `comicsmith_interface` - `ImageProvider` and `TranscriptSource` traits
//! - `comicsmith_rate_limit` - Configuration and provider rate limiting
//! - `comicsmith_models` - HTTP image backends
//! - `comicsmith_narrative` - Planner, continuity, prompts, coordinator, assembler
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chain;
mod json_source;
pub mod observability;

pub use chain::build_fallback_chain;
pub use json_source::JsonTranscriptSource;

pub use comicsmith_core::*;
pub use comicsmith_error::*;
pub use comicsmith_interface::*;
pub use comicsmith_models::*;
pub use comicsmith_narrative::*;
pub use comicsmith_rate_limit::*;
