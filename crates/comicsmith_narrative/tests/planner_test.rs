//! Tests for scene and panel segmentation.

mod test_utils;

use comicsmith_core::{CharacterId, Mood, PanelKind};
use comicsmith_error::SegmentationErrorKind;
use comicsmith_narrative::{ScenePlanner, validate_segmentation};
use comicsmith_rate_limit::PlannerConfig;
use test_utils::{act, cast, narrate, say, stream};

fn planner(config: PlannerConfig) -> ScenePlanner {
    ScenePlanner::new(config).unwrap()
}

fn scene_sizes(scenes: &[comicsmith_core::Scene]) -> Vec<usize> {
    scenes.iter().map(|scene| scene.event_count()).collect()
}

#[test]
fn test_empty_stream_plans_no_scenes() {
    let scenes = planner(PlannerConfig::default())
        .plan(&stream(vec![]), &cast())
        .unwrap();
    assert!(scenes.is_empty());
}

#[test]
fn test_scenes_and_panels_partition_the_stream() {
    let events = stream(vec![
        say("e1", 0, "aria", "The bridge is out."),
        say("e2", 5, "borin", "Then we climb down."),
        act("e3", 10, "aria", "ties a rope to the railing"),
        say("e4", 15, "borin", "Hold it steady!"),
        act("e5", 20, "borin", "climbs down the rope"),
        narrate("e6", 25, "Meanwhile, in the city below"),
        act("e7", 30, "cass", "picks the lock on the vault"),
        say("e8", 35, "cass", "Too easy."),
        act("e9", 40, "cass", "slips inside"),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    validate_segmentation(&scenes, events.len()).unwrap();
    assert_eq!(scenes.first().unwrap().event_range.start, 0);
    assert_eq!(scenes.last().unwrap().event_range.end, events.len());

    for (index, scene) in scenes.iter().enumerate() {
        assert_eq!(scene.ordinal as usize, index + 1);
        for (panel_index, panel) in scene.panels.iter().enumerate() {
            assert_eq!(panel.scene_id, scene.id);
            assert_eq!(panel.ordinal_in_scene as usize, panel_index + 1);
            assert!(!panel.covered_events.is_empty());
            assert!(panel.covered_events.start >= scene.event_range.start);
            assert!(panel.covered_events.end <= scene.event_range.end);
        }
    }

    let ids: Vec<_> = scenes
        .iter()
        .flat_map(|scene| scene.panels.iter().map(|panel| panel.id))
        .collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "panel ids follow story order");
}

#[test]
fn test_narration_marker_starts_a_scene() {
    let events = stream(vec![
        say("e1", 0, "aria", "Drinks are on me."),
        say("e2", 10, "borin", "Finally."),
        say("e3", 20, "aria", "Just one round."),
        narrate("e4", 30, "Meanwhile, at the docks"),
        act("e5", 40, "cass", "counts the crates"),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert_eq!(scene_sizes(&scenes), vec![3, 2]);
    assert_eq!(scenes[0].location_hint.as_deref(), Some("tavern"));
    assert_eq!(
        scenes[1].location_hint.as_deref(),
        Some("Meanwhile, at the docks")
    );
}

#[test]
fn test_time_skip_starts_a_scene() {
    let events = stream(vec![
        say("e1", 0, "aria", "We camp here."),
        say("e2", 10, "borin", "Agreed."),
        say("e3", 4000, "aria", "Dawn already?"),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert_eq!(scene_sizes(&scenes), vec![2, 1]);
}

#[test]
fn test_event_cap_closes_scenes() {
    let events = stream(vec![
        say("e1", 0, "aria", "One."),
        say("e2", 1, "borin", "Two."),
        say("e3", 2, "aria", "Three."),
        say("e4", 3, "borin", "Four."),
        say("e5", 4, "aria", "Five."),
    ]);
    let config = PlannerConfig {
        max_events_per_scene: 3,
        ..PlannerConfig::default()
    };
    let scenes = planner(config).plan(&events, &cast()).unwrap();

    assert_eq!(scene_sizes(&scenes), vec![3, 2]);
}

#[test]
fn test_cast_change_starts_a_scene() {
    let events = stream(vec![
        say("e1", 0, "aria", "Keep watch."),
        say("e2", 5, "borin", "Always."),
        say("e3", 10, "aria", "Good."),
        act("e4", 15, "cass", "creeps along the rooftop"),
        say("e5", 20, "cass", "Nobody saw me."),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert_eq!(scene_sizes(&scenes), vec![3, 2]);
    assert!(scenes[1].cast().contains(&CharacterId::from("cass")));
    assert!(!scenes[1].cast().contains(&CharacterId::from("aria")));
}

#[test]
fn test_cast_change_waits_for_minimum_scene_length() {
    let events = stream(vec![
        say("e1", 0, "aria", "Keep watch."),
        act("e2", 5, "cass", "creeps along the rooftop"),
        say("e3", 10, "cass", "Nobody saw me."),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert_eq!(scene_sizes(&scenes), vec![3]);
}

#[test]
fn test_completed_beat_starts_a_panel() {
    let events = stream(vec![
        act("e1", 0, "aria", "draws her bow"),
        say("e2", 5, "borin", "Careful now."),
        act("e3", 10, "aria", "looses an arrow"),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert_eq!(scenes.len(), 1);
    let panels = &scenes[0].panels;
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[0].covered_events, 0..2);
    assert_eq!(panels[1].covered_events, 2..3);
    assert_eq!(panels[0].kind, PanelKind::Action);
    assert_eq!(panels[0].action_summary, "Aria: draws her bow");
    assert_eq!(panels[0].dialogue.len(), 1);
}

#[test]
fn test_panel_cap_merges_at_weakest_boundaries() {
    let events = stream(vec![
        say("e1", 0, "aria", "I have a plan."),
        say("e2", 5, "aria", "It involves a goat."),
        say("e3", 10, "borin", "No."),
        say("e4", 15, "borin", "Absolutely not."),
    ]);
    let config = PlannerConfig {
        max_events_per_panel: 1,
        max_panels_per_scene: 2,
        ..PlannerConfig::default()
    };
    let scenes = planner(config).plan(&events, &cast()).unwrap();

    assert_eq!(scenes.len(), 1);
    let ranges: Vec<_> = scenes[0]
        .panels
        .iter()
        .map(|panel| panel.covered_events.clone())
        .collect();
    assert_eq!(ranges, vec![0..2, 2..4]);
    assert_eq!(scenes[0].panels[0].kind, PanelKind::Dialogue);
    assert_eq!(scenes[0].panels[0].action_summary, "Aria speaks");
}

#[test]
fn test_narration_only_scene_is_establishing() {
    let events = stream(vec![
        narrate("e1", 0, "Rain lashes the harbor."),
        narrate("e2", 5, "Lanterns sway on the masts."),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    let panel = &scenes[0].panels[0];
    assert_eq!(panel.kind, PanelKind::Establishing);
    assert!(panel.characters_present.is_empty());
    assert_eq!(
        panel.narration.as_deref(),
        Some("Rain lashes the harbor. Lanterns sway on the masts.")
    );
    assert!(scenes[0].mood_tags.contains(&Mood::Calm));
}

#[test]
fn test_combat_raises_tension() {
    let events = stream(vec![
        act("e1", 0, "borin", "attacks the ogre with his hammer"),
        say("e2", 5, "aria", "Help!"),
    ]);
    let scenes = planner(PlannerConfig::default())
        .plan(&events, &cast())
        .unwrap();

    assert!(scenes[0].tension >= 0.8);
    assert!(scenes[0].mood_tags.contains(&Mood::Combat));
    assert!(!scenes[0].mood_tags.contains(&Mood::Calm));
}

#[test]
fn test_planning_is_deterministic() {
    let events = stream(vec![
        say("e1", 0, "aria", "Which way?"),
        act("e2", 5, "borin", "points north"),
        say("e3", 10, "cass", "North it is."),
        narrate("e4", 20, "Hours later, the party arrives at the gate"),
        act("e5", 30, "aria", "knocks"),
    ]);
    let planner = planner(PlannerConfig::default());

    let first = planner.plan(&events, &cast()).unwrap();
    let second = planner.plan(&events, &cast()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_invalid_marker_is_rejected() {
    let config = PlannerConfig {
        location_markers: vec!["(unclosed".to_string()],
        ..PlannerConfig::default()
    };
    let err = ScenePlanner::new(config).unwrap_err();
    assert!(matches!(err.kind, SegmentationErrorKind::InvalidMarker { .. }));
}

#[test]
fn test_validate_segmentation_reports_gaps() {
    let events = stream(vec![
        say("e1", 0, "aria", "One."),
        say("e2", 1, "borin", "Two."),
        say("e3", 2, "aria", "Three."),
        say("e4", 3, "borin", "Four."),
    ]);
    let config = PlannerConfig {
        max_events_per_scene: 2,
        ..PlannerConfig::default()
    };
    let mut scenes = planner(config).plan(&events, &cast()).unwrap();
    assert_eq!(scenes.len(), 2);

    scenes[1].event_range = 3..4;
    let err = validate_segmentation(&scenes, events.len()).unwrap_err();
    assert!(matches!(
        err.kind,
        SegmentationErrorKind::NonContiguousScene {
            scene: 2,
            start: 3,
            expected: 2
        }
    ));

    scenes.pop();
    let err = validate_segmentation(&scenes, events.len()).unwrap_err();
    assert!(matches!(
        err.kind,
        SegmentationErrorKind::IncompleteCoverage { covered: 2, total: 4 }
    ));
}
