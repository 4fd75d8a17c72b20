//! Keyword-derived mood and tension of events.

use comicsmith_core::{Event, EventKind, Mood};
use std::collections::BTreeSet;

const COMBAT_WORDS: &[&str] = &[
    "attack", "battle", "cast", "damage", "fight", "slash", "strike", "stab", "shoot", "parry",
];
const PERIL_WORDS: &[&str] = &[
    "danger", "death", "destroy", "die", "dying", "final", "kill", "last", "threat",
];
const MOTION_WORDS: &[&str] = &["climb", "dash", "dive", "fly", "jump", "leap", "move", "run", "swim"];
const HIGH_TENSION_WORDS: &[&str] = &["death", "die", "dying", "kill", "destroy", "final", "last"];
const MEDIUM_TENSION_WORDS: &[&str] = &["attack", "fight", "battle", "danger", "threat"];
const OUTCRIES: &[&str] = &["no!", "help!", "stop!", "wait!"];

/// Whether `text` contains `keyword` as a word, allowing simple inflections.
pub(crate) fn mentions(text: &str, keyword: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .any(|word| {
            word == keyword
                || ["s", "es", "ed", "d", "ing", "ping", "ning"]
                    .iter()
                    .any(|suffix| word.strip_suffix(suffix) == Some(keyword))
        })
}

pub(crate) fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| mentions(text, keyword))
}

/// Moods suggested by a single event.
pub(crate) fn event_moods(event: &Event) -> BTreeSet<Mood> {
    let mut moods = BTreeSet::new();
    if mentions_any(&event.text, COMBAT_WORDS) {
        moods.insert(Mood::Combat);
    }
    if mentions_any(&event.text, PERIL_WORDS) {
        moods.insert(Mood::Peril);
    }
    if mentions_any(&event.text, MOTION_WORDS) || event.kind == EventKind::Action {
        moods.insert(Mood::Action);
    }
    if event.kind == EventKind::Dialogue {
        moods.insert(Mood::Dialogue);
    }
    moods
}

/// Moods of a run of events; `Calm` when nothing in it is charged.
pub(crate) fn scene_moods(events: &[Event]) -> BTreeSet<Mood> {
    let mut moods: BTreeSet<Mood> = events.iter().flat_map(event_moods).collect();
    if !moods
        .iter()
        .any(|mood| matches!(mood, Mood::Combat | Mood::Peril | Mood::Action))
    {
        moods.insert(Mood::Calm);
    }
    moods
}

/// Dramatic tension of a single event in `0.0..=1.0`.
pub(crate) fn event_tension(event: &Event) -> f32 {
    let mut tension: f32 = match event.kind {
        EventKind::Action if mentions_any(&event.text, COMBAT_WORDS) => 0.8,
        EventKind::Action => 0.6,
        EventKind::Dialogue => 0.2,
        EventKind::System => 0.0,
    };
    if mentions_any(&event.text, HIGH_TENSION_WORDS) {
        tension += 0.3;
    }
    if mentions_any(&event.text, MEDIUM_TENSION_WORDS) {
        tension += 0.2;
    }
    let lowered = event.text.to_lowercase();
    if OUTCRIES.iter().any(|cry| lowered.contains(cry)) {
        tension += 0.3;
    }
    tension.min(1.0)
}
