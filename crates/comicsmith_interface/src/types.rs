//! Types exchanged with the ingestion collaborator.

use comicsmith_core::{Character, Event};
use serde::{Deserialize, Serialize};

/// Normalized transcript: the mission cast and its events in ingestion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Mission cast
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Events, not yet ordered or filtered
    pub events: Vec<Event>,
}
