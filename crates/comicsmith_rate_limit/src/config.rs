//! Configuration structures for the pipeline.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from comicsmith.toml)
//! - User overrides (./comicsmith.toml or ~/.config/comicsmith/comicsmith.toml)
//! - Automatic merging with user values taking precedence

use crate::Tier;
use comicsmith_core::{EventFilter, ImageQuality, ImageSize};
use comicsmith_error::{ComicsmithError, ComicsmithResult, ConfigError};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Scene and panel segmentation thresholds.
///
/// ```toml
/// [planner]
/// max_events_per_scene = 40
/// max_scene_duration_secs = 3600
/// cast_change_threshold = 0.6
/// max_panels_per_scene = 8
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Event count at which a scene is closed
    pub max_events_per_scene: usize,
    /// Scene duration at which a scene is closed
    pub max_scene_duration_secs: Option<u64>,
    /// Silence between consecutive events that counts as a time skip
    pub scene_break_gap_secs: u64,
    /// Jaccard distance between scene cast and upcoming cast that forces a break
    pub cast_change_threshold: f64,
    /// Number of upcoming events whose actors form the upcoming cast
    pub cast_window: usize,
    /// Events a scene must hold before a cast change may close it
    pub min_events_per_scene: usize,
    /// Event budget for a single panel
    pub max_events_per_panel: usize,
    /// Panel cap per scene
    pub max_panels_per_scene: usize,
    /// Regex patterns marking a location change or time skip in narration
    pub location_markers: Vec<String>,
    /// Which ingested events reach the planner
    pub filter: EventFilter,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_events_per_scene: 40,
            max_scene_duration_secs: Some(3600),
            scene_break_gap_secs: 1800,
            cast_change_threshold: 0.6,
            cast_window: 4,
            min_events_per_scene: 3,
            max_events_per_panel: 4,
            max_panels_per_scene: 8,
            location_markers: vec![
                r"(?i)\b(meanwhile|elsewhere|hours later|days later|later that (day|night)|the next (morning|day|night))\b".to_string(),
                r"(?i)\b(arrive[sd]? (at|in)|enter(s|ed)? (the|a)|travel(s|ed)? to|step(s|ped)? (through|into))\b".to_string(),
                r"(?i)^\s*(scene|location)\s*:".to_string(),
                r"^\s*(\*\*\*|---)\s*$".to_string(),
            ],
            filter: EventFilter::default(),
        }
    }
}

impl PlannerConfig {
    /// Maximum scene duration, if capped.
    pub fn max_scene_duration(&self) -> Option<Duration> {
        self.max_scene_duration_secs.map(Duration::from_secs)
    }

    /// Gap between events that starts a new scene.
    pub fn scene_break_gap(&self) -> Duration {
        Duration::from_secs(self.scene_break_gap_secs)
    }

    /// Check thresholds for values the planner cannot honour.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_events_per_scene == 0 {
            return Err(ConfigError::invalid("planner.max_events_per_scene", "must be at least 1"));
        }
        if self.max_events_per_panel == 0 {
            return Err(ConfigError::invalid("planner.max_events_per_panel", "must be at least 1"));
        }
        if self.max_panels_per_scene == 0 {
            return Err(ConfigError::invalid("planner.max_panels_per_scene", "must be at least 1"));
        }
        if self.scene_break_gap_secs == 0 {
            return Err(ConfigError::invalid(
                "planner.scene_break_gap_secs",
                "must be at least 1, or every new timestamp opens a scene",
            ));
        }
        if self.cast_window == 0 {
            return Err(ConfigError::invalid("planner.cast_window", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.cast_change_threshold) {
            return Err(ConfigError::invalid(
                "planner.cast_change_threshold",
                format!("must be in [0.0, 1.0], got {}", self.cast_change_threshold),
            ));
        }
        for pattern in &self.location_markers {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::invalid(
                    "planner.location_markers",
                    format!("holds an invalid pattern '{}': {}", pattern, e),
                )
            })?;
        }
        Ok(())
    }
}

/// Coordinator policy shared by all providers.
///
/// ```toml
/// [generation]
/// worker_pool_size = 4
/// cancellation_grace_ms = 5000
/// fallback_order = ["openai", "stability"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum concurrent in-flight provider calls
    pub worker_pool_size: usize,
    /// How long in-flight requests may run after cancellation
    pub cancellation_grace_ms: u64,
    /// Provider names, tried in order
    pub fallback_order: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            cancellation_grace_ms: 5000,
            fallback_order: vec!["openai".to_string(), "stability".to_string()],
        }
    }
}

impl GenerationConfig {
    /// Grace period for in-flight work after cancellation.
    pub fn cancellation_grace(&self) -> Duration {
        Duration::from_millis(self.cancellation_grace_ms)
    }
}

/// Quota and retry policy for one provider.
///
/// Implements [`Tier`] so it can configure a [`crate::RateLimiter`].
///
/// ```toml
/// [providers.openai]
/// requests_per_window = 5
/// window_secs = 60
/// retry_budget = 3
/// initial_backoff_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name (filled from the table key when omitted)
    pub name: String,
    /// Requests admitted per window (unlimited when `None`)
    pub requests_per_window: Option<u32>,
    /// Window length in seconds
    pub window_secs: u64,
    /// Concurrency cap for this provider (unlimited when `None`)
    pub max_concurrent: Option<u32>,
    /// Attempts per request against this provider, first attempt included
    pub retry_budget: u32,
    /// First backoff delay
    pub initial_backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
    /// Model identifier sent to the provider
    pub model: Option<String>,
    /// Endpoint override
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            requests_per_window: Some(5),
            window_secs: 60,
            max_concurrent: None,
            retry_budget: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            model: None,
            endpoint: None,
            api_key_env: None,
        }
    }
}

impl ProviderConfig {
    /// First backoff delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff ceiling.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Check values the limiter and coordinator cannot honour.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_budget == 0 {
            return Err(ConfigError::invalid(
                format!("providers.{}.retry_budget", self.name),
                "must be at least 1",
            ));
        }
        if self.requests_per_window.is_some() && self.window_secs == 0 {
            return Err(ConfigError::invalid(
                format!("providers.{}.window_secs", self.name),
                "must be positive when requests_per_window is set",
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::invalid(
                format!("providers.{}.max_backoff_ms", self.name),
                "must not be below initial_backoff_ms",
            ));
        }
        Ok(())
    }
}

impl Tier for ProviderConfig {
    fn requests_per_window(&self) -> Option<u32> {
        self.requests_per_window
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn max_concurrent(&self) -> Option<u32> {
        self.max_concurrent
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Page packing policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Panel slots per page
    pub max_panels_per_page: usize,
    /// Start a scene on a fresh page when it would fit there but not in the current page
    pub keep_scenes_together: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_panels_per_page: 6,
            keep_scenes_together: true,
        }
    }
}

/// Prompt style guide.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Style prefix for every prompt
    pub base_style: String,
    /// Style for action panels
    pub action_style: String,
    /// Style for dialogue panels
    pub dialogue_style: String,
    /// Style for establishing panels
    pub establishing_style: String,
    /// Output dimensions
    pub size: ImageSize,
    /// Rendering quality
    pub quality: ImageQuality,
    /// Prompts longer than this are truncated
    pub max_prompt_chars: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            base_style: "comic book art style, detailed illustration, vibrant colors".to_string(),
            action_style: "action scene, dynamic movement, energy effects".to_string(),
            dialogue_style: "character interaction, emotional expressions, clear composition"
                .to_string(),
            establishing_style: "fantasy environment, atmospheric lighting, detailed background"
                .to_string(),
            size: ImageSize::default(),
            quality: ImageQuality::default(),
            max_prompt_chars: 4000,
        }
    }
}

/// Top-level Comicsmith configuration.
///
/// Loads from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from comicsmith.toml)
/// 2. User override (~/.config/comicsmith/comicsmith.toml, then ./comicsmith.toml)
///
/// # Example
///
/// ```
/// use comicsmith_rate_limit::ComicsmithConfig;
///
/// let config = ComicsmithConfig::from_toml_str(
///     r#"
///     [planner]
///     max_events_per_scene = 3
///
///     [providers.openai]
///     retry_budget = 4
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.planner.max_events_per_scene, 3);
/// assert_eq!(config.provider("openai").unwrap().retry_budget, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ComicsmithConfig {
    /// Segmentation thresholds
    pub planner: PlannerConfig,
    /// Coordinator policy
    pub generation: GenerationConfig,
    /// Per-provider quota and retry policy
    pub providers: BTreeMap<String, ProviderConfig>,
    /// Page packing
    pub layout: LayoutConfig,
    /// Prompt style guide
    pub style: StyleConfig,
}

impl ComicsmithConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ComicsmithResult<Self> {
        debug!("Loading configuration from file");

        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ComicsmithError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?;
        Self::deserialize_config(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml_str(toml: &str) -> ComicsmithResult<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                ComicsmithError::from(ConfigError::new(format!(
                    "Failed to read configuration: {}",
                    e
                )))
            })?;
        Self::deserialize_config(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (comicsmith.toml shipped with the library)
    /// 2. User config in home directory (~/.config/comicsmith/comicsmith.toml)
    /// 3. User config in current directory (./comicsmith.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> ComicsmithResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../comicsmith.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/comicsmith/comicsmith.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("comicsmith").required(false));

        let config = builder.build().map_err(|e| {
            ComicsmithError::from(ConfigError::new(format!(
                "Failed to build configuration: {}",
                e
            )))
        })?;
        Self::deserialize_config(config)
    }

    fn deserialize_config(config: Config) -> ComicsmithResult<Self> {
        let mut parsed: Self = config.try_deserialize().map_err(|e| {
            ComicsmithError::from(ConfigError::new(format!(
                "Failed to parse configuration: {}",
                e
            )))
        })?;
        for (name, provider) in parsed.providers.iter_mut() {
            if provider.name.is_empty() {
                provider.name = name.clone();
            }
        }
        parsed.validate()?;
        Ok(parsed)
    }

    /// Provider configuration by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Provider configurations in fallback order.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback order names an unconfigured provider.
    pub fn fallback_providers(&self) -> Result<Vec<ProviderConfig>, ConfigError> {
        self.generation
            .fallback_order
            .iter()
            .map(|name| {
                self.providers.get(name).cloned().ok_or_else(|| {
                    ConfigError::invalid(
                        "generation.fallback_order",
                        format!("names unknown provider '{}'", name),
                    )
                })
            })
            .collect()
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.planner.validate()?;
        if self.generation.worker_pool_size == 0 {
            return Err(ConfigError::invalid("generation.worker_pool_size", "must be at least 1"));
        }
        for provider in self.providers.values() {
            provider.validate()?;
        }
        if self.style.max_prompt_chars == 0 {
            return Err(ConfigError::invalid("style.max_prompt_chars", "must be positive"));
        }
        Ok(())
    }
}
