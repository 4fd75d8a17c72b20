//! Scenes and panels produced by segmentation.

use crate::{CharacterId, PanelId, SceneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// Keyword-derived mood of a scene.
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
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mood {
    /// Fighting, spells, damage
    Combat,
    /// Life-or-death stakes
    Peril,
    /// Movement and physical feats
    Action,
    /// Mostly conversation
    Dialogue,
    /// Nothing pressing
    Calm,
}

/// What a panel primarily shows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PanelKind {
    /// Setting or narration without a character beat
    Establishing,
    /// A discrete physical action and its reactions
    Action,
    /// An exchange of lines
    Dialogue,
}

/// A line spoken within a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Who speaks
    pub speaker: CharacterId,
    /// What is said
    pub text: String,
}

/// One illustrated unit within a scene.
///
/// `covered_events` indexes into the mission's event stream and always lies
/// inside the owning scene's `event_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    /// Story-ordered id
    pub id: PanelId,
    /// Owning scene
    pub scene_id: SceneId,
    /// 1-based position within the scene
    pub ordinal_in_scene: u32,
    /// Non-empty, contiguous stream indices
    pub covered_events: Range<usize>,
    /// Characters acting in the covered events
    pub characters_present: BTreeSet<CharacterId>,
    /// One-line description of what happens
    pub action_summary: String,
    /// Primary panel content
    pub kind: PanelKind,
    /// Spoken lines, in order
    pub dialogue: Vec<DialogueLine>,
    /// Caption text from narration events
    pub narration: Option<String>,
}

impl Panel {
    /// Number of covered events.
    pub fn event_count(&self) -> usize {
        self.covered_events.len()
    }
}

/// A contiguous span of events sharing location, participants and mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene id
    pub id: SceneId,
    /// 1-based position in the mission
    pub ordinal: u32,
    /// Contiguous stream indices
    pub event_range: Range<usize>,
    /// Where the scene takes place, when known
    pub location_hint: Option<String>,
    /// Keyword-derived moods
    pub mood_tags: BTreeSet<Mood>,
    /// Dramatic tension in `0.0..=1.0`
    pub tension: f32,
    /// Ordered panels partitioning `event_range`
    pub panels: Vec<Panel>,
}

impl Scene {
    /// Number of events in the scene.
    pub fn event_count(&self) -> usize {
        self.event_range.len()
    }

    /// Union of the cast of every panel.
    pub fn cast(&self) -> BTreeSet<CharacterId> {
        self.panels
            .iter()
            .flat_map(|panel| panel.characters_present.iter().cloned())
            .collect()
    }
}
