//! Mission cast.

use crate::CharacterId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A member of the mission cast, created once from the character sheet.
///
/// `canonical_description` is the visual baseline; continuity overrides
/// refine it but never replace it.
///
/// # Examples
///
/// ```
/// use comicsmith_core::CharacterBuilder;
///
/// let aria = CharacterBuilder::default()
///     .id("aria")
///     .name("Aria")
///     .canonical_description("half-elf ranger, auburn braid, green cloak")
///     .trait_tags(["ranger".to_string()].into_iter().collect::<std::collections::BTreeSet<String>>())
///     .build()
///     .unwrap();
/// assert_eq!(aria.name, "Aria");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct Character {
    /// Stable identifier referenced by events
    pub id: CharacterId,
    /// Display name
    pub name: String,
    /// Baseline visual description
    pub canonical_description: String,
    /// Free-form tags (class, race, role)
    #[builder(default)]
    #[serde(default)]
    pub trait_tags: BTreeSet<String>,
}
