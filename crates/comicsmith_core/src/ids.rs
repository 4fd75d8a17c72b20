//! Identifier newtypes.
//!
//! Scene, panel and page ids are derived from 1-based ordinals, so their
//! `Ord` implementations follow story order.

use serde::{Deserialize, Serialize};

/// Identifier of an ingested event.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
#[display("{}", _0)]
pub struct EventId(pub String);

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a mission character.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
#[display("{}", _0)]
pub struct CharacterId(pub String);

impl From<&str> for CharacterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CharacterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a scene: its 1-based ordinal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
#[display("scene-{}", _0)]
pub struct SceneId(pub u32);

/// Identifier of a panel: scene ordinal plus ordinal within the scene.
///
/// # Examples
///
/// ```
/// use comicsmith_core::PanelId;
///
/// let first = PanelId::new(1, 3);
/// let later = PanelId::new(2, 1);
/// assert!(first < later);
/// assert_eq!(first.to_string(), "panel-1.3");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("panel-{}.{}", scene, index)]
pub struct PanelId {
    /// Ordinal of the owning scene
    pub scene: u32,
    /// Ordinal within the scene
    pub index: u32,
}

impl PanelId {
    /// Create a panel id from its scene ordinal and in-scene ordinal.
    pub fn new(scene: u32, index: u32) -> Self {
        Self { scene, index }
    }

    /// Id of the owning scene.
    pub fn scene_id(&self) -> SceneId {
        SceneId(self.scene)
    }
}

/// Identifier of a page: its 1-based ordinal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
#[display("page-{}", _0)]
pub struct PageId(pub u32);
