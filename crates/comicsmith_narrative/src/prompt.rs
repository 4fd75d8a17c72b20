//! Panel to generation request conversion.

use crate::ContinuityTracker;
use crate::mood::mentions_any;
use comicsmith_core::{
    GenerationConstraints, GenerationRequest, Mood, Panel, PanelKind, Scene,
};
use comicsmith_error::ContinuityError;
use comicsmith_rate_limit::StyleConfig;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const QUALITY_SUFFIX: &str = "high quality, detailed, professional comic book illustration";

/// Builds self-contained generation requests from panels.
///
/// A prompt embeds every character's effective description as of the panel
/// being built, so a provider never needs state from earlier panels.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    style: StyleConfig,
}

impl PromptBuilder {
    /// Create a builder with a style guide.
    pub fn new(style: StyleConfig) -> Self {
        Self { style }
    }

    /// Style guide in use.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Build the request for one panel.
    ///
    /// Reads continuity only; commits for this panel must happen afterwards.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` if the panel shows someone outside the cast.
    #[instrument(skip_all, fields(panel_id = %panel.id))]
    pub fn build(
        &self,
        scene: &Scene,
        panel: &Panel,
        tracker: &ContinuityTracker,
    ) -> Result<GenerationRequest, ContinuityError> {
        let mut sheets = BTreeMap::new();
        let mut cast_parts = Vec::new();
        for id in &panel.characters_present {
            let description = tracker.effective_description(id, panel.id)?;
            let name = tracker
                .character(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| id.to_string());
            cast_parts.push(format!("{} ({})", name, description));
            sheets.insert(id.clone(), description);
        }

        let mut parts: Vec<String> = vec![
            self.style.base_style.clone(),
            self.kind_style(panel.kind).to_string(),
        ];
        if !cast_parts.is_empty() {
            parts.push(format!("Characters: {}", cast_parts.join(" and ")));
        }
        if let Some(location) = &scene.location_hint {
            parts.push(format!("Setting: {}", location));
        }
        if !panel.action_summary.is_empty() {
            parts.push(format!("Action: {}", panel.action_summary));
        }
        if let Some(expression) = dialogue_expression(panel) {
            parts.push(expression.to_string());
        }
        let moods: Vec<String> = scene
            .mood_tags
            .iter()
            .filter(|mood| **mood != Mood::Dialogue)
            .map(Mood::to_string)
            .collect();
        if !moods.is_empty() {
            parts.push(format!("Mood: {}", moods.join(", ")));
        }
        parts.push(format!("Composition: {}", composition(panel, scene)));
        parts.push(format!("Lighting: {}", lighting(scene)));
        parts.push(QUALITY_SUFFIX.to_string());

        let prompt = truncate_prompt(parts.join(", "), self.style.max_prompt_chars);
        debug!(prompt_chars = prompt.chars().count(), "Built panel prompt");

        let constraints = GenerationConstraints {
            size: self.style.size,
            quality: self.style.quality,
            style: self.style.base_style.clone(),
            character_sheets: sheets,
        };
        Ok(GenerationRequest::new(panel.id, prompt, constraints))
    }

    fn kind_style(&self, kind: PanelKind) -> &str {
        match kind {
            PanelKind::Action => &self.style.action_style,
            PanelKind::Dialogue => &self.style.dialogue_style,
            PanelKind::Establishing => &self.style.establishing_style,
        }
    }
}

fn dialogue_expression(panel: &Panel) -> Option<&'static str> {
    if panel.kind != PanelKind::Dialogue {
        return None;
    }
    let text = panel
        .dialogue
        .iter()
        .map(|line| line.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    Some(if text.contains('!') {
        "dramatic facial expression, intense emotion"
    } else if text.contains('?') || mentions_any(&text, &["what", "how", "why"]) {
        "questioning expression, curious pose"
    } else if mentions_any(&text, &["tired", "sad", "sorry", "afraid"]) {
        "melancholic expression, subdued posture"
    } else if mentions_any(&text, &["yes", "good", "great", "excellent"]) {
        "positive expression, confident posture"
    } else {
        "natural conversation pose, engaged expression"
    })
}

fn composition(panel: &Panel, scene: &Scene) -> &'static str {
    match panel.kind {
        PanelKind::Action if scene.tension > 0.7 => "dynamic angle, close-up action shot",
        PanelKind::Action => "medium shot, action composition",
        PanelKind::Dialogue => match panel.characters_present.len() {
            0 | 1 => "medium close-up, character focus",
            2 => "two-shot, conversational framing",
            _ => "group shot, ensemble composition",
        },
        PanelKind::Establishing => "wide shot, establishing shot, environmental focus",
    }
}

fn lighting(scene: &Scene) -> &'static str {
    let location = scene
        .location_hint
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if location.contains("underwater") {
        "underwater lighting, filtered blue-green tones"
    } else if location.contains("ship") {
        "maritime lighting, deck illumination"
    } else if location.contains("portal") || location.contains("gate") {
        "magical portal lighting, mystical glow"
    } else if location.contains("cave") || location.contains("cavern") {
        "cave lighting, dramatic shadows"
    } else if scene.tension > 0.8 {
        "dramatic lighting, high contrast, intense shadows"
    } else if scene.tension > 0.5 {
        "dynamic lighting, moderate contrast"
    } else {
        "natural lighting, balanced exposure"
    }
}

fn truncate_prompt(prompt: String, max_chars: usize) -> String {
    match prompt.char_indices().nth(max_chars) {
        Some((cut, _)) => prompt[..cut].trim_end_matches([',', ' ']).to_string(),
        None => prompt,
    }
}
