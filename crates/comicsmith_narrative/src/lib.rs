//! Narrative stages of the Comicsmith pipeline.
//!
//! This crate turns an ordered event stream into comic pages:
//!
//! - [`ScenePlanner`] partitions the stream into scenes and panels
//! - [`ContinuityTracker`] keeps each character's look consistent across panels
//! - [`PromptBuilder`] turns a panel into a self-contained generation request
//! - [`GenerationCoordinator`] runs requests against a [`FallbackChain`] of providers
//! - [`PageAssembler`] packs panels onto pages in story order
//!
//! [`ComicPipeline`] sequences the stages into a finished [`Mission`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assembler;
mod cancellation;
mod continuity;
mod coordinator;
mod mission;
mod mood;
mod pipeline;
mod planner;
mod prompt;

pub use assembler::{Assembly, AssemblyWarning, PageAssembler};
pub use cancellation::RunCancellation;
pub use continuity::{
    AppliedOverride, ContinuityDelta, ContinuityState, ContinuityTracker, DeltaExtractor,
    visual_baseline,
};
pub use coordinator::{FallbackChain, GenerationCoordinator, ProviderEntry};
pub use mission::{
    Mission, MissionReporter, MissionStatus, MissionSummary, PanelFailure, TracingReporter,
};
pub use pipeline::ComicPipeline;
pub use planner::{ScenePlanner, validate_segmentation};
pub use prompt::PromptBuilder;
