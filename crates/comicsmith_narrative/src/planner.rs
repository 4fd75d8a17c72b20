//! Scene and panel segmentation.
//!
//! The planner scans the event stream once, closing a scene whenever a
//! narration marker, a time skip, a cast change or a size cap says the story
//! has moved on. Each scene is then cut into panels at completed beats and,
//! if that yields too many panels, merged back down at the boundaries whose
//! removal loses the least information.

use crate::mood::{event_tension, scene_moods};
use comicsmith_core::{
    Character, CharacterId, DialogueLine, Event, EventKind, EventStream, Panel, PanelId,
    PanelKind, Scene, SceneId,
};
use comicsmith_error::{SegmentationError, SegmentationErrorKind};
use comicsmith_rate_limit::PlannerConfig;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use tracing::{debug, info, instrument};

const MAX_SUMMARY_CHARS: usize = 160;
const MAX_HINT_CHARS: usize = 80;

/// Why a scene was closed before an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum SceneBreak {
    Marker,
    TimeSkip,
    EventCap,
    Duration,
    CastChange,
}

/// Partitions an event stream into scenes and panels.
///
/// Planning is deterministic: identical input and configuration always
/// produce identical scenes.
#[derive(Debug, Clone)]
pub struct ScenePlanner {
    config: PlannerConfig,
    markers: Vec<Regex>,
}

impl ScenePlanner {
    /// Create a planner, compiling the configured location markers.
    ///
    /// # Errors
    ///
    /// Returns an error if a marker pattern is not a valid regex.
    pub fn new(config: PlannerConfig) -> Result<Self, SegmentationError> {
        let markers = config
            .location_markers
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SegmentationError::new(SegmentationErrorKind::InvalidMarker {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, markers })
    }

    /// Planner configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Segment a stream into ordered scenes, each owning ordered panels.
    ///
    /// An empty stream yields no scenes.
    ///
    /// # Errors
    ///
    /// Returns an error if the produced segmentation violates its own
    /// partition invariants.
    #[instrument(skip_all, fields(events = stream.len(), characters = characters.len()))]
    pub fn plan(
        &self,
        stream: &EventStream,
        characters: &[Character],
    ) -> Result<Vec<Scene>, SegmentationError> {
        let events = stream.events();
        if events.is_empty() {
            debug!("Empty event stream, no scenes planned");
            return Ok(Vec::new());
        }

        let names: HashMap<&CharacterId, &str> = characters
            .iter()
            .map(|character| (&character.id, character.name.as_str()))
            .collect();

        let mut scenes = Vec::new();
        let mut previous_hint: Option<String> = None;
        for (index, range) in self.scene_ranges(events).into_iter().enumerate() {
            let ordinal = index as u32 + 1;
            let scene_events = &events[range.clone()];

            let location_hint = self
                .marker_hint(&scene_events[0])
                .or_else(|| previous_hint.clone())
                .or_else(|| Some(scene_events[0].channel.clone()));
            previous_hint = location_hint.clone();

            let tension = scene_events
                .iter()
                .map(event_tension)
                .fold(0.0_f32, f32::max);

            let panels = self
                .panel_ranges(events, range.clone())
                .into_iter()
                .enumerate()
                .map(|(panel_index, panel_range)| {
                    build_panel(
                        events,
                        ordinal,
                        panel_index as u32 + 1,
                        panel_range,
                        &names,
                        location_hint.as_deref(),
                    )
                })
                .collect();

            scenes.push(Scene {
                id: SceneId(ordinal),
                ordinal,
                event_range: range,
                location_hint,
                mood_tags: scene_moods(scene_events),
                tension,
                panels,
            });
        }

        validate_segmentation(&scenes, events.len())?;
        info!(
            scenes = scenes.len(),
            panels = scenes.iter().map(|s| s.panels.len()).sum::<usize>(),
            "Planned scenes"
        );
        Ok(scenes)
    }

    fn is_marker(&self, event: &Event) -> bool {
        event.is_narration() && self.markers.iter().any(|m| m.is_match(&event.text))
    }

    fn marker_hint(&self, event: &Event) -> Option<String> {
        self.is_marker(event)
            .then(|| truncate(event.text.trim(), MAX_HINT_CHARS))
    }

    fn scene_ranges(&self, events: &[Event]) -> Vec<Range<usize>> {
        let max_duration = self
            .config
            .max_scene_duration()
            .and_then(|d| chrono::Duration::from_std(d).ok());
        let gap = chrono::Duration::from_std(self.config.scene_break_gap()).ok();

        let mut ranges = Vec::new();
        let mut start = 0;
        let mut cast: BTreeSet<&CharacterId> = BTreeSet::new();

        for (i, event) in events.iter().enumerate() {
            if i > start {
                let held = i - start;
                let reason = if self.is_marker(event) {
                    Some(SceneBreak::Marker)
                } else if gap.is_some_and(|gap| event.timestamp - events[i - 1].timestamp > gap) {
                    Some(SceneBreak::TimeSkip)
                } else if held >= self.config.max_events_per_scene {
                    Some(SceneBreak::EventCap)
                } else if max_duration
                    .is_some_and(|max| event.timestamp - events[start].timestamp > max)
                {
                    Some(SceneBreak::Duration)
                } else if held >= self.config.min_events_per_scene
                    && self.cast_changes(&cast, &events[i..])
                {
                    Some(SceneBreak::CastChange)
                } else {
                    None
                };

                if let Some(reason) = reason {
                    debug!(scene_start = start, scene_end = i, %reason, "Closing scene");
                    ranges.push(start..i);
                    start = i;
                    cast.clear();
                }
            }
            if let Some(id) = event.actor.character() {
                cast.insert(id);
            }
        }
        ranges.push(start..events.len());
        ranges
    }

    fn cast_changes(&self, cast: &BTreeSet<&CharacterId>, upcoming: &[Event]) -> bool {
        let window: BTreeSet<&CharacterId> = upcoming
            .iter()
            .take(self.config.cast_window)
            .filter_map(|event| event.actor.character())
            .collect();
        if cast.is_empty() || window.is_empty() {
            return false;
        }
        let shared = cast.intersection(&window).count() as f64;
        let union = cast.union(&window).count() as f64;
        1.0 - shared / union > self.config.cast_change_threshold
    }

    fn panel_ranges(&self, events: &[Event], scene: Range<usize>) -> Vec<Range<usize>> {
        let mut boundaries = Vec::new();
        let mut groupable = 0;
        let mut seen_action = false;
        let mut reactions = 0;

        for i in scene.clone() {
            let event = &events[i];
            if !event.is_groupable() {
                continue;
            }
            let beat_complete = event.kind == EventKind::Action && seen_action && reactions > 0;
            if groupable > 0 && (beat_complete || groupable >= self.config.max_events_per_panel) {
                boundaries.push(i);
                groupable = 0;
                seen_action = false;
                reactions = 0;
            }
            groupable += 1;
            if seen_action {
                reactions += 1;
            } else if event.kind == EventKind::Action {
                seen_action = true;
            }
        }

        if boundaries.len() + 1 > self.config.max_panels_per_scene {
            boundaries = merge_boundaries(events, boundaries, self.config.max_panels_per_scene);
        }

        let mut ranges = Vec::with_capacity(boundaries.len() + 1);
        let mut start = scene.start;
        for boundary in boundaries {
            ranges.push(start..boundary);
            start = boundary;
        }
        ranges.push(start..scene.end);
        ranges
    }
}

/// Keep the `max_panels - 1` boundaries whose removal would lose the most.
///
/// Speaker turns and boundaries before an action are worth keeping; a
/// boundary inside one speaker's run is the first to go. Ties keep the
/// earliest boundary.
fn merge_boundaries(events: &[Event], boundaries: Vec<usize>, max_panels: usize) -> Vec<usize> {
    let keep = max_panels.saturating_sub(1);
    let mut scored: Vec<(u32, usize)> = boundaries
        .iter()
        .map(|&boundary| (boundary_score(events, boundary), boundary))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let mut kept: Vec<usize> = scored.into_iter().take(keep).map(|(_, b)| b).collect();
    kept.sort_unstable();
    debug!(
        dropped = boundaries.len() - kept.len(),
        kept = kept.len(),
        "Merged panels down to scene cap"
    );
    kept
}

fn boundary_score(events: &[Event], boundary: usize) -> u32 {
    let next = &events[boundary];
    let mut score = 0;
    if next.kind == EventKind::Action {
        score += 2;
    }
    let previous_speaker = events[..boundary]
        .iter()
        .rev()
        .find(|event| event.is_groupable())
        .map(|event| &event.actor);
    if previous_speaker.is_some_and(|actor| *actor != next.actor) {
        score += 2;
    }
    if boundary > 0 && events[boundary - 1].kind != next.kind {
        score += 1;
    }
    score
}

fn build_panel(
    events: &[Event],
    scene_ordinal: u32,
    ordinal: u32,
    range: Range<usize>,
    names: &HashMap<&CharacterId, &str>,
    location_hint: Option<&str>,
) -> Panel {
    let covered = &events[range.clone()];
    let name_of = |id: &CharacterId| {
        names
            .get(id)
            .map(|name| name.to_string())
            .unwrap_or_else(|| id.to_string())
    };

    let characters_present: BTreeSet<CharacterId> = covered
        .iter()
        .filter_map(|event| event.actor.character().cloned())
        .collect();

    let dialogue: Vec<DialogueLine> = covered
        .iter()
        .filter(|event| event.kind == EventKind::Dialogue)
        .filter_map(|event| {
            event.actor.character().map(|speaker| DialogueLine {
                speaker: speaker.clone(),
                text: event.text.clone(),
            })
        })
        .collect();

    let narration_parts: Vec<&str> = covered
        .iter()
        .filter(|event| event.is_narration())
        .map(|event| event.text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    let narration = (!narration_parts.is_empty()).then(|| narration_parts.join(" "));

    let first_action = covered
        .iter()
        .find(|event| event.kind == EventKind::Action && !event.is_narration());

    let (kind, summary) = if let Some(action) = first_action {
        let actor = action.actor.character().map(&name_of).unwrap_or_default();
        (PanelKind::Action, format!("{}: {}", actor, action.text.trim()))
    } else if !dialogue.is_empty() {
        let speakers: Vec<String> = dialogue
            .iter()
            .map(|line| &line.speaker)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(&name_of)
            .collect();
        let summary = match speakers.as_slice() {
            [one] => format!("{} speaks", one),
            [init @ .., last] => format!("{} and {} talk", init.join(", "), last),
            [] => String::new(),
        };
        (PanelKind::Dialogue, summary)
    } else {
        let summary = narration
            .clone()
            .or_else(|| location_hint.map(|hint| format!("Establishing shot: {}", hint)))
            .unwrap_or_else(|| "Establishing shot".to_string());
        (PanelKind::Establishing, summary)
    };

    Panel {
        id: PanelId::new(scene_ordinal, ordinal),
        scene_id: SceneId(scene_ordinal),
        ordinal_in_scene: ordinal,
        covered_events: range,
        characters_present,
        action_summary: truncate(&summary, MAX_SUMMARY_CHARS),
        kind,
        dialogue,
        narration,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Check that scenes partition `0..total_events` in order and that each
/// scene's panels partition its range.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_segmentation(
    scenes: &[Scene],
    total_events: usize,
) -> Result<(), SegmentationError> {
    let mut expected = 0;
    for scene in scenes {
        if scene.event_range.start != expected {
            return Err(SegmentationError::new(
                SegmentationErrorKind::NonContiguousScene {
                    scene: scene.ordinal,
                    start: scene.event_range.start,
                    expected,
                },
            ));
        }
        if scene.event_range.is_empty() {
            return Err(SegmentationError::new(SegmentationErrorKind::EmptyRange(
                scene.id.to_string(),
            )));
        }
        if scene.panels.is_empty() {
            return Err(SegmentationError::new(
                SegmentationErrorKind::PanelPartition {
                    scene: scene.ordinal,
                    message: "scene has no panels".to_string(),
                },
            ));
        }

        let mut panel_cursor = scene.event_range.start;
        for panel in &scene.panels {
            if panel.covered_events.is_empty() {
                return Err(SegmentationError::new(SegmentationErrorKind::EmptyRange(
                    panel.id.to_string(),
                )));
            }
            if panel.covered_events.start != panel_cursor {
                return Err(SegmentationError::new(
                    SegmentationErrorKind::PanelPartition {
                        scene: scene.ordinal,
                        message: format!(
                            "{} starts at {} instead of {}",
                            panel.id, panel.covered_events.start, panel_cursor
                        ),
                    },
                ));
            }
            panel_cursor = panel.covered_events.end;
        }
        if panel_cursor != scene.event_range.end {
            return Err(SegmentationError::new(
                SegmentationErrorKind::PanelPartition {
                    scene: scene.ordinal,
                    message: format!(
                        "panels end at {} but the scene ends at {}",
                        panel_cursor, scene.event_range.end
                    ),
                },
            ));
        }
        expected = scene.event_range.end;
    }

    if expected != total_events {
        return Err(SegmentationError::new(
            SegmentationErrorKind::IncompleteCoverage {
                covered: expected,
                total: total_events,
            },
        ));
    }
    Ok(())
}
