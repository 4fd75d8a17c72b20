//! Test utilities for Comicsmith narrative tests.
//!
//! This module provides a mock image provider and builders for events,
//! characters and provider chains.

#![allow(dead_code)]

pub mod mock_provider;

#[allow(unused_imports)]
pub use mock_provider::{MockBehavior, MockImageProvider};

use chrono::{DateTime, Duration, TimeZone, Utc};
use comicsmith_core::{Actor, Character, CharacterBuilder, Event, EventKind, EventStream};
use comicsmith_interface::ImageProvider;
use comicsmith_narrative::{FallbackChain, ProviderEntry};
use comicsmith_rate_limit::{GenerationConfig, ProviderConfig};
use std::sync::Arc;

/// Fixed start of every test transcript.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap()
}

/// An event `secs` seconds after [`t0`].
pub fn event(id: &str, secs: i64, actor: Option<&str>, kind: EventKind, text: &str) -> Event {
    Event {
        id: id.into(),
        timestamp: t0() + Duration::seconds(secs),
        channel: "tavern".to_string(),
        actor: match actor {
            Some(character) => Actor::Character(character.into()),
            None => Actor::Narrator,
        },
        kind,
        text: text.to_string(),
    }
}

/// A spoken line.
pub fn say(id: &str, secs: i64, speaker: &str, text: &str) -> Event {
    event(id, secs, Some(speaker), EventKind::Dialogue, text)
}

/// A character action.
pub fn act(id: &str, secs: i64, actor: &str, text: &str) -> Event {
    event(id, secs, Some(actor), EventKind::Action, text)
}

/// Narration.
pub fn narrate(id: &str, secs: i64, text: &str) -> Event {
    event(id, secs, None, EventKind::System, text)
}

/// A cast member.
pub fn character(id: &str, name: &str, description: &str) -> Character {
    CharacterBuilder::default()
        .id(id)
        .name(name)
        .canonical_description(description)
        .build()
        .unwrap()
}

/// The cast used across tests.
pub fn cast() -> Vec<Character> {
    vec![
        character("aria", "Aria", "half-elf ranger, auburn braid, green cloak"),
        character("borin", "Borin", "stout dwarf cleric, grey beard, chainmail"),
        character("cass", "Cass", "tiefling rogue, violet skin, black leathers"),
    ]
}

/// A stream built from events.
pub fn stream(events: Vec<Event>) -> EventStream {
    EventStream::new(events).unwrap()
}

/// Provider policy with tiny backoff and no quota, for fast tests.
pub fn fast_policy(name: &str, retry_budget: u32) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        requests_per_window: None,
        retry_budget,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        ..ProviderConfig::default()
    }
}

/// A chain over mock providers, each with the given retry budget.
pub fn chain(providers: &[MockImageProvider], retry_budget: u32) -> FallbackChain {
    FallbackChain::new(
        providers
            .iter()
            .map(|provider| {
                ProviderEntry::new(
                    Arc::new(provider.clone()),
                    fast_policy(provider.provider_name(), retry_budget),
                )
            })
            .collect(),
    )
}

/// Generation policy with a pool size and grace period.
pub fn generation(worker_pool_size: usize, cancellation_grace_ms: u64) -> GenerationConfig {
    GenerationConfig {
        worker_pool_size,
        cancellation_grace_ms,
        ..GenerationConfig::default()
    }
}
