//! Cross-panel character continuity.
//!
//! The tracker is the single writer of continuity state. Each commit appends
//! an override tagged with the panel it came from; snapshots filter the log
//! up to a panel and copy it out, so a snapshot taken mid-pipeline is never
//! changed by later commits.

use comicsmith_core::{Character, CharacterId, Event, EventStream, Panel, PanelId};
use comicsmith_error::{ConfigError, ContinuityError, ContinuityErrorKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

const MAX_VALUE_CHARS: usize = 60;

/// One visual attribute change for a character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuityDelta {
    /// Attribute name (e.g. `attire`, `held_item`)
    pub attribute: String,
    /// New value of the attribute
    pub value: String,
}

impl ContinuityDelta {
    /// Create a delta.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// A delta as recorded by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOverride {
    /// Panel whose commit applied the delta
    pub panel_id: PanelId,
    /// The delta
    pub delta: ContinuityDelta,
}

/// A copy of one character's continuity as of some panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityState {
    /// Character the state belongs to
    pub character_id: CharacterId,
    /// Overrides applied up to the snapshot panel, oldest first
    pub description_overrides: Vec<AppliedOverride>,
    /// Panel of the most recent override in this snapshot
    pub last_updated_panel_id: Option<PanelId>,
}

impl ContinuityState {
    /// Current value of every overridden attribute; the most recent override wins.
    pub fn effective_attributes(&self) -> BTreeMap<&str, &str> {
        self.description_overrides
            .iter()
            .map(|o| (o.delta.attribute.as_str(), o.delta.value.as_str()))
            .collect()
    }

    /// Baseline description refined by the effective attributes.
    pub fn describe(&self, canonical_description: &str) -> String {
        let attributes = self.effective_attributes();
        if attributes.is_empty() {
            return canonical_description.to_string();
        }
        let refinements: Vec<String> = attributes
            .iter()
            .map(|(attribute, value)| format!("{}: {}", attribute.replace('_', " "), value))
            .collect();
        format!("{}; {}", canonical_description, refinements.join("; "))
    }
}

const CLASS_VISUALS: &[(&str, &str)] = &[
    ("barbarian", "tribal markings, fierce expression, primitive weapons"),
    ("bard", "musical instrument, charismatic pose, colorful clothing"),
    ("cleric", "holy symbol, divine aura, healing hands"),
    ("druid", "natural materials, earth tones, connection to nature"),
    ("fighter", "martial stance, battle-worn equipment"),
    ("monk", "simple robes, martial arts stance, inner peace"),
    ("paladin", "shining armor, divine weapon, righteous bearing"),
    ("ranger", "nature-worn clothing, bow, animal companion"),
    ("rogue", "leather armor, daggers, stealthy posture"),
    ("sorcerer", "innate magic aura, elemental effects around hands"),
    ("warlock", "dark magic effects, otherworldly patron marks"),
    ("wizard", "robes, spellbook, arcane focus"),
];

const WEAPON_WORDS: &[&str] = &["sword", "bow", "staff", "axe", "dagger", "hammer", "mace", "spear"];
const ARMOR_WORDS: &[&str] = &["armor", "armour", "shield", "helmet", "cloak", "mail"];
const MAGIC_WORDS: &[&str] = &["ring", "amulet", "crystal", "magical", "wand", "orb"];

/// Most equipment tags of one kind shown in a description.
const MAX_ITEMS_PER_KIND: usize = 2;

/// Canonical description plus the visuals implied by the trait tags.
///
/// Class tags (`wizard`, `rogue`, ...) add their signature look. Equipment
/// tags are grouped into weapons (`wielding ...`), armor (`wearing ...`)
/// and magic items (`adorned with ...`), at most two of each. Other tags
/// add nothing.
///
/// # Examples
///
/// ```
/// use comicsmith_core::CharacterBuilder;
/// use comicsmith_narrative::visual_baseline;
///
/// let mira = CharacterBuilder::default()
///     .id("mira")
///     .name("Mira")
///     .canonical_description("young human, freckles")
///     .trait_tags(["wizard".to_string(), "oak staff".to_string()].into_iter().collect::<std::collections::BTreeSet<String>>())
///     .build()
///     .unwrap();
/// assert_eq!(
///     visual_baseline(&mira),
///     "young human, freckles, wielding oak staff, robes, spellbook, arcane focus"
/// );
/// ```
pub fn visual_baseline(character: &Character) -> String {
    let mut weapons = Vec::new();
    let mut armor = Vec::new();
    let mut magic = Vec::new();
    let mut class_looks = Vec::new();

    for tag in &character.trait_tags {
        let lower = tag.trim().to_lowercase();
        if let Some((_, look)) = CLASS_VISUALS.iter().find(|(class, _)| *class == lower) {
            class_looks.push(*look);
        } else if WEAPON_WORDS.iter().any(|word| lower.contains(word)) {
            weapons.push(tag.trim());
        } else if ARMOR_WORDS.iter().any(|word| lower.contains(word)) {
            armor.push(tag.trim());
        } else if MAGIC_WORDS.iter().any(|word| lower.contains(word)) {
            magic.push(tag.trim());
        }
    }

    let mut parts = vec![character.canonical_description.trim().to_string()];
    for (verb, items) in [("wielding", weapons), ("wearing", armor), ("adorned with", magic)] {
        if !items.is_empty() {
            let shown: Vec<&str> = items.into_iter().take(MAX_ITEMS_PER_KIND).collect();
            parts.push(format!("{} {}", verb, shown.join(", ")));
        }
    }
    parts.extend(class_looks.into_iter().map(str::to_string));
    parts.retain(|part| !part.is_empty());
    parts.join(", ")
}

/// Owns the continuity state of every character in a mission.
///
/// # Examples
///
/// ```
/// use comicsmith_core::{CharacterBuilder, PanelId};
/// use comicsmith_narrative::{ContinuityDelta, ContinuityTracker};
///
/// let aria = CharacterBuilder::default()
///     .id("aria")
///     .name("Aria")
///     .canonical_description("half-elf ranger")
///     .build()
///     .unwrap();
/// let mut tracker = ContinuityTracker::new([aria]);
///
/// tracker
///     .commit(&"aria".into(), ContinuityDelta::new("held_item", "longbow"), PanelId::new(1, 2))
///     .unwrap();
///
/// let before = tracker.snapshot(&"aria".into(), PanelId::new(1, 1)).unwrap();
/// assert!(before.description_overrides.is_empty());
///
/// let after = tracker.snapshot(&"aria".into(), PanelId::new(2, 1)).unwrap();
/// assert_eq!(after.effective_attributes()["held_item"], "longbow");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContinuityTracker {
    characters: BTreeMap<CharacterId, Character>,
    overrides: HashMap<CharacterId, Vec<AppliedOverride>>,
}

impl ContinuityTracker {
    /// Create a tracker for a mission cast.
    pub fn new(characters: impl IntoIterator<Item = Character>) -> Self {
        Self {
            characters: characters
                .into_iter()
                .map(|character| (character.id.clone(), character))
                .collect(),
            overrides: HashMap::new(),
        }
    }

    /// A cast member by id.
    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.get(id)
    }

    /// The mission cast in id order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Copy of a character's state including every override committed for
    /// panels up to and including `as_of_panel`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` for ids outside the cast.
    pub fn snapshot(
        &self,
        character_id: &CharacterId,
        as_of_panel: PanelId,
    ) -> Result<ContinuityState, ContinuityError> {
        self.require(character_id)?;
        let description_overrides: Vec<AppliedOverride> = self
            .overrides
            .get(character_id)
            .map(|log| {
                log.iter()
                    .take_while(|o| o.panel_id <= as_of_panel)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let last_updated_panel_id = description_overrides.last().map(|o| o.panel_id);
        Ok(ContinuityState {
            character_id: character_id.clone(),
            description_overrides,
            last_updated_panel_id,
        })
    }

    /// Effective description of a character as of a panel.
    ///
    /// The baseline is the canonical description enriched by the visuals of
    /// the character's class and equipment tags (see [`visual_baseline`]).
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` for ids outside the cast.
    pub fn effective_description(
        &self,
        character_id: &CharacterId,
        as_of_panel: PanelId,
    ) -> Result<String, ContinuityError> {
        let character = self.require(character_id)?;
        let state = self.snapshot(character_id, as_of_panel)?;
        Ok(state.describe(&visual_baseline(character)))
    }

    /// Append an override for a character.
    ///
    /// Several commits for the same panel are allowed; a commit for a panel
    /// earlier than the last one committed for the character is not.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` for ids outside the cast and
    /// `OutOfOrderCommit` when continuity would move backwards.
    #[instrument(skip(self, delta), fields(character = %character_id, panel = %panel_id, attribute = %delta.attribute))]
    pub fn commit(
        &mut self,
        character_id: &CharacterId,
        delta: ContinuityDelta,
        panel_id: PanelId,
    ) -> Result<(), ContinuityError> {
        self.require(character_id)?;
        let log = self.overrides.entry(character_id.clone()).or_default();
        if let Some(last) = log.last()
            && last.panel_id > panel_id
        {
            return Err(ContinuityError::new(ContinuityErrorKind::OutOfOrderCommit {
                character: character_id.to_string(),
                last_committed: last.panel_id.to_string(),
                attempted: panel_id.to_string(),
            }));
        }
        debug!(value = %delta.value, "Committing continuity override");
        log.push(AppliedOverride { panel_id, delta });
        Ok(())
    }

    fn require(&self, character_id: &CharacterId) -> Result<&Character, ContinuityError> {
        self.characters.get(character_id).ok_or_else(|| {
            ContinuityError::new(ContinuityErrorKind::UnknownCharacter(
                character_id.to_string(),
            ))
        })
    }
}

/// Derives continuity deltas from what characters do in a panel.
///
/// Recognizes attire changes, items drawn or put away, injuries and
/// transformations in action and dialogue text, attributed to the acting
/// character.
#[derive(Debug, Clone)]
pub struct DeltaExtractor {
    cues: Vec<(&'static str, Regex, Option<&'static str>)>,
}

impl DeltaExtractor {
    /// Compile the cue patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a cue pattern fails to compile.
    pub fn new() -> Result<Self, ConfigError> {
        const ARTICLE: &str = r"(?:a |an |the |her |his |their |its )?";
        let patterns: [(&'static str, String, Option<&'static str>); 5] = [
            (
                "attire",
                format!(
                    r"(?i)\b(?:puts on|put on|dons|donned|changes into|changed into|is wearing|now wears)\s+{}([^.,;!?]+)",
                    ARTICLE
                ),
                None,
            ),
            (
                "held_item",
                format!(
                    r"(?i)\b(?:draws|drew|picks up|picked up|grabs|grabbed|wields|unsheathes|unsheathed|raises|raised|readies|readied)\s+{}([^.,;!?]+)",
                    ARTICLE
                ),
                None,
            ),
            (
                "held_item",
                r"(?i)\b(?:drops|dropped|sheathes|sheathed|stows|stowed|puts away)\b".to_string(),
                Some("empty-handed"),
            ),
            (
                "condition",
                r"(?i)\b(?:is|was|becomes|became|looks|gets|got|now)\s+(wounded|injured|bloodied|exhausted|soaked|drenched|poisoned|burned|frozen|unconscious|bruised|invisible)\b".to_string(),
                None,
            ),
            (
                "form",
                format!(
                    r"(?i)\b(?:transforms into|transformed into|turns into|turned into|shifts into|shifted into|polymorphs into|wild shapes into)\s+{}([^.,;!?]+)",
                    ARTICLE
                ),
                None,
            ),
        ];

        let cues = patterns
            .into_iter()
            .map(|(attribute, pattern, fixed)| {
                Regex::new(&pattern)
                    .map(|regex| (attribute, regex, fixed))
                    .map_err(|e| ConfigError::new(format!("Invalid continuity cue: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cues })
    }

    /// Deltas implied by the events a panel covers, in event order.
    pub fn extract(&self, panel: &Panel, stream: &EventStream) -> Vec<(CharacterId, ContinuityDelta)> {
        stream
            .slice(panel.covered_events.clone())
            .iter()
            .flat_map(|event| self.extract_event(event))
            .collect()
    }

    fn extract_event(&self, event: &Event) -> Vec<(CharacterId, ContinuityDelta)> {
        let Some(actor) = event.actor.character() else {
            return Vec::new();
        };
        if event.is_narration() {
            return Vec::new();
        }

        let mut found: Vec<(usize, CharacterId, ContinuityDelta)> = Vec::new();
        for (attribute, regex, fixed) in &self.cues {
            for captures in regex.captures_iter(&event.text) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let value = match fixed {
                    Some(value) => value.to_string(),
                    None => match captures.get(1) {
                        Some(m) => clean_value(m.as_str()),
                        None => continue,
                    },
                };
                if value.is_empty() {
                    continue;
                }
                found.push((
                    whole.start(),
                    actor.clone(),
                    ContinuityDelta::new(*attribute, value),
                ));
            }
        }
        // stable: cues matching at the same offset keep cue order
        found.sort_by_key(|(offset, _, _)| *offset);
        found
            .into_iter()
            .map(|(_, character, delta)| (character, delta))
            .collect()
    }
}

fn clean_value(raw: &str) -> String {
    let trimmed = raw
        .split(" and ")
        .next()
        .unwrap_or(raw)
        .trim()
        .trim_end_matches(|c: char| !c.is_alphanumeric());
    match trimmed.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
