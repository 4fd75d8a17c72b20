//! Tests for prompt building.

mod test_utils;

use comicsmith_core::{CharacterId, ImageQuality, ImageSize, PanelKind, Scene};
use comicsmith_error::ContinuityErrorKind;
use comicsmith_narrative::{ContinuityDelta, ContinuityTracker, PromptBuilder, ScenePlanner};
use comicsmith_rate_limit::{PlannerConfig, StyleConfig};
use test_utils::{act, cast, say, stream};

fn plan(events: Vec<comicsmith_core::Event>) -> Vec<Scene> {
    ScenePlanner::new(PlannerConfig::default())
        .unwrap()
        .plan(&stream(events), &cast())
        .unwrap()
}

fn archery_scene() -> Scene {
    let mut scenes = plan(vec![
        act("e1", 0, "aria", "draws her longbow"),
        say("e2", 5, "borin", "What was that?"),
        act("e3", 10, "aria", "looses an arrow into the dark"),
    ]);
    assert_eq!(scenes.len(), 1);
    scenes.remove(0)
}

#[test]
fn test_prompt_layers_style_cast_and_setting() {
    let scene = archery_scene();
    let panel = &scene.panels[0];
    let tracker = ContinuityTracker::new(cast());
    let style = StyleConfig::default();

    let request = PromptBuilder::new(style.clone())
        .build(&scene, panel, &tracker)
        .unwrap();
    let prompt = &request.prompt_text;

    assert!(prompt.starts_with(&style.base_style));
    let order = [
        style.action_style.as_str(),
        "Characters: Aria (half-elf ranger, auburn braid, green cloak) and Borin (stout dwarf cleric, grey beard, chainmail)",
        "Setting: tavern",
        "Action: Aria: draws her longbow",
        "Mood: action",
        "Composition: medium shot, action composition",
        "Lighting: dynamic lighting, moderate contrast",
        "professional comic book illustration",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|part| {
            prompt
                .find(part)
                .unwrap_or_else(|| panic!("missing '{}' in {}", part, prompt))
        })
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(!prompt.contains("dialogue"));
}

#[test]
fn test_prompt_reflects_continuity_as_of_its_panel() {
    let scene = archery_scene();
    let (first, second) = (&scene.panels[0], &scene.panels[1]);
    let mut tracker = ContinuityTracker::new(cast());
    let builder = PromptBuilder::default();

    let before = builder.build(&scene, first, &tracker).unwrap();
    tracker
        .commit(&"aria".into(), ContinuityDelta::new("held_item", "longbow"), first.id)
        .unwrap();
    let after = builder.build(&scene, second, &tracker).unwrap();

    assert!(!before.prompt_text.contains("held item"));
    assert!(
        after
            .prompt_text
            .contains("Aria (half-elf ranger, auburn braid, green cloak; held item: longbow)")
    );
    assert_eq!(
        after.constraints.character_sheets[&CharacterId::from("aria")],
        "half-elf ranger, auburn braid, green cloak; held item: longbow"
    );
}

#[test]
fn test_request_is_self_contained() {
    let scene = archery_scene();
    let panel = &scene.panels[0];
    let tracker = ContinuityTracker::new(cast());
    let style = StyleConfig {
        size: ImageSize {
            width: 1792,
            height: 1024,
        },
        quality: ImageQuality::Hd,
        ..StyleConfig::default()
    };

    let request = PromptBuilder::new(style.clone())
        .build(&scene, panel, &tracker)
        .unwrap();

    assert_eq!(request.panel_id, panel.id);
    assert_eq!(request.attempt_count, 0);
    assert_eq!(request.constraints.size, style.size);
    assert_eq!(request.constraints.quality, ImageQuality::Hd);
    assert_eq!(request.constraints.style, style.base_style);
    let sheet_ids: Vec<_> = request.constraints.character_sheets.keys().cloned().collect();
    let present: Vec<_> = panel.characters_present.iter().cloned().collect();
    assert_eq!(sheet_ids, present);
}

#[test]
fn test_dialogue_panel_frames_the_speakers() {
    let scenes = plan(vec![
        say("e1", 0, "aria", "Who goes there?"),
        say("e2", 5, "cass", "Just me."),
    ]);
    let panel = &scenes[0].panels[0];
    assert_eq!(panel.kind, PanelKind::Dialogue);

    let request = PromptBuilder::default()
        .build(&scenes[0], panel, &ContinuityTracker::new(cast()))
        .unwrap();

    assert!(request.prompt_text.contains(&StyleConfig::default().dialogue_style));
    assert!(request.prompt_text.contains("questioning expression"));
    assert!(request.prompt_text.contains("two-shot, conversational framing"));
}

#[test]
fn test_prompt_is_capped() {
    let scene = archery_scene();
    let style = StyleConfig {
        max_prompt_chars: 50,
        ..StyleConfig::default()
    };

    let request = PromptBuilder::new(style)
        .build(&scene, &scene.panels[0], &ContinuityTracker::new(cast()))
        .unwrap();

    assert!(request.prompt_text.chars().count() <= 50);
    assert!(!request.prompt_text.ends_with(','));
}

#[test]
fn test_character_outside_the_cast_is_an_error() {
    let scene = archery_scene();
    let partial_cast: Vec<_> = cast().into_iter().filter(|c| c.id.0 != "borin").collect();

    let err = PromptBuilder::default()
        .build(&scene, &scene.panels[0], &ContinuityTracker::new(partial_cast))
        .unwrap_err();

    assert!(matches!(err.kind, ContinuityErrorKind::UnknownCharacter(ref id) if id == "borin"));
}

#[test]
fn test_trait_tags_add_class_and_equipment_visuals() {
    let scene = archery_scene();
    let mut tagged_cast = cast();
    tagged_cast[0].trait_tags = ["ranger", "yew longbow", "elven cloak", "moonstone amulet", "half-elf"]
        .into_iter()
        .map(String::from)
        .collect();
    let tracker = ContinuityTracker::new(tagged_cast);

    let request = PromptBuilder::default()
        .build(&scene, &scene.panels[0], &tracker)
        .unwrap();

    let aria = &request.constraints.character_sheets[&CharacterId::from("aria")];
    assert_eq!(
        aria.as_str(),
        "half-elf ranger, auburn braid, green cloak, wielding yew longbow, wearing elven cloak, \
         adorned with moonstone amulet, nature-worn clothing, bow, animal companion"
    );
    assert!(request.prompt_text.contains("Aria (half-elf ranger, auburn braid"));
    assert!(request.prompt_text.contains("wielding yew longbow"));

    let borin = &request.constraints.character_sheets[&CharacterId::from("borin")];
    assert_eq!(borin.as_str(), "stout dwarf cleric, grey beard, chainmail");
}

#[test]
fn test_equipment_visuals_show_at_most_two_per_kind() {
    let scene = archery_scene();
    let mut tagged_cast = cast();
    tagged_cast[0].trait_tags = ["a dagger", "b sword", "c axe"]
        .into_iter()
        .map(String::from)
        .collect();
    let tracker = ContinuityTracker::new(tagged_cast);

    let description = tracker
        .effective_description(&CharacterId::from("aria"), scene.panels[0].id)
        .unwrap();

    assert!(description.ends_with("wielding a dagger, b sword"));
    assert!(!description.contains("c axe"));
}
