//! Core data types for the Comicsmith pipeline.
//!
//! This crate provides the data model shared by every stage: the ingested
//! [`EventStream`], the mission cast, the [`Scene`]/[`Panel`] structure the
//! planner produces, generation requests and results, and assembled pages.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod character;
mod event;
mod generation;
mod ids;
mod page;
mod scene;

pub use character::{Character, CharacterBuilder, CharacterBuilderError};
pub use event::{Actor, Event, EventFilter, EventKind, EventStream};
pub use generation::{
    FailureReason, GenerationConstraints, GenerationConstraintsBuilder,
    GenerationConstraintsBuilderError, GenerationOutcome, GenerationRequest, GenerationResult,
    GenerationStatus, ImageQuality, ImageRef, ImageSize,
};
pub use ids::{CharacterId, EventId, PageId, PanelId, SceneId};
pub use page::{Page, PanelSlot};
pub use scene::{DialogueLine, Mood, Panel, PanelKind, Scene};
