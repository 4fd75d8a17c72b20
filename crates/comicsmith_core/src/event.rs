//! Narrative events and the ordered stream the planner consumes.

use crate::{CharacterId, EventId};
use chrono::{DateTime, Utc};
use comicsmith_error::{SegmentationError, SegmentationErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

/// Kind of narrative unit an event carries.
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
pub enum EventKind {
    /// A spoken line
    Dialogue,
    /// Something a character does
    Action,
    /// Out-of-fiction or environmental narration (scene changes, rolls)
    System,
}

/// Who an event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The narrator or game master
    Narrator,
    /// A member of the mission cast
    Character(CharacterId),
}

impl Actor {
    /// Character id when the actor is a character.
    pub fn character(&self) -> Option<&CharacterId> {
        match self {
            Actor::Character(id) => Some(id),
            Actor::Narrator => None,
        }
    }
}

/// One atomic narrative unit.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use comicsmith_core::{Actor, Event, EventKind};
///
/// let event = Event {
///     id: "e1".into(),
///     timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap(),
///     channel: "tavern".to_string(),
///     actor: Actor::Character("aria".into()),
///     kind: EventKind::Dialogue,
///     text: "We ride at dawn.".to_string(),
/// };
/// assert!(event.is_groupable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier supplied by ingestion
    pub id: EventId,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// Source channel (e.g. a chat room)
    pub channel: String,
    /// Who the event is attributed to
    pub actor: Actor,
    /// Dialogue, action or system narration
    pub kind: EventKind,
    /// Event text
    pub text: String,
}

impl Event {
    /// Whether the event is narration rather than something a character does.
    pub fn is_narration(&self) -> bool {
        self.kind == EventKind::System || self.actor == Actor::Narrator
    }

    /// Whether the event drives panel grouping (dialogue or action).
    pub fn is_groupable(&self) -> bool {
        matches!(self.kind, EventKind::Dialogue | EventKind::Action)
    }
}

/// Selects which ingested events reach the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Keep only these channels (all channels when `None`)
    #[serde(default)]
    pub channels: Option<BTreeSet<String>>,
    /// Drop events of these kinds
    #[serde(default)]
    pub drop_kinds: BTreeSet<EventKind>,
}

impl EventFilter {
    /// Whether an event passes the filter.
    pub fn accepts(&self, event: &Event) -> bool {
        let channel_ok = self
            .channels
            .as_ref()
            .is_none_or(|channels| channels.contains(&event.channel));
        channel_ok && !self.drop_kinds.contains(&event.kind)
    }
}

/// Ordered, immutable sequence of events.
///
/// Events are ordered by timestamp, with ingestion order breaking ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStream {
    events: Vec<Event>,
}

impl EventStream {
    /// Build a stream from ingested events.
    ///
    /// # Errors
    ///
    /// Returns an error if two events share an id.
    pub fn new(mut events: Vec<Event>) -> Result<Self, SegmentationError> {
        let mut seen = HashSet::with_capacity(events.len());
        for event in &events {
            if !seen.insert(&event.id) {
                return Err(SegmentationError::new(
                    SegmentationErrorKind::DuplicateEventId(event.id.to_string()),
                ));
            }
        }
        // stable: ties keep ingestion order
        events.sort_by_key(|event| event.timestamp);
        Ok(Self { events })
    }

    /// Apply a filter, keeping stream order.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty stream filters down to nothing.
    pub fn filtered(self, filter: &EventFilter) -> Result<Self, SegmentationError> {
        let before = self.events.len();
        let events: Vec<Event> = self
            .events
            .into_iter()
            .filter(|event| filter.accepts(event))
            .collect();
        if before > 0 && events.is_empty() {
            return Err(SegmentationError::new(
                SegmentationErrorKind::EmptyAfterFilter(before),
            ));
        }
        Ok(Self { events })
    }

    /// All events in order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events covered by a range of stream indices.
    pub fn slice(&self, range: Range<usize>) -> &[Event] {
        &self.events[range]
    }

    /// Event at a stream index.
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the stream has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
