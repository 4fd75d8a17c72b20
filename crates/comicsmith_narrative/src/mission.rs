//! A single transcript-to-comic run and what it produced.

use crate::{AssemblyWarning, ContinuityTracker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comicsmith_core::{
    Character, EventStream, GenerationRequest, GenerationResult, GenerationStatus, Page, PanelId,
    Scene,
};
use comicsmith_error::ComicsmithResult;
use comicsmith_rate_limit::ComicsmithConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Lifecycle of a mission.
///
/// Moves forward only: Planning, Prompting, Generating, Assembling, then
/// Completed, or Aborted when the run was cancelled.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MissionStatus {
    /// Segmenting the event stream
    #[default]
    Planning,
    /// Building prompts and committing continuity
    Prompting,
    /// Waiting on image providers
    Generating,
    /// Packing pages
    Assembling,
    /// Finished normally
    Completed,
    /// Finished after cancellation
    Aborted,
}

impl MissionStatus {
    /// Whether the mission has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Aborted)
    }
}

/// Owns everything a run produces.
#[derive(Debug, Clone)]
pub struct Mission {
    /// Unique run id
    pub id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Mission cast
    pub characters: Vec<Character>,
    /// Filtered, ordered events
    pub stream: EventStream,
    /// Planned scenes with their panels
    pub scenes: Vec<Scene>,
    /// One request per panel, in story order
    pub requests: Vec<GenerationRequest>,
    /// Terminal result per panel
    pub results: BTreeMap<PanelId, GenerationResult>,
    /// Assembled pages
    pub pages: Vec<Page>,
    /// Layout warnings raised during assembly
    pub warnings: Vec<AssemblyWarning>,
    /// Continuity as of the end of prompting
    pub tracker: ContinuityTracker,
    /// Configuration the run used
    pub config: ComicsmithConfig,
    /// Lifecycle status
    pub status: MissionStatus,
}

impl Mission {
    /// Start a mission in the planning state.
    pub fn new(characters: Vec<Character>, stream: EventStream, config: ComicsmithConfig) -> Self {
        let tracker = ContinuityTracker::new(characters.iter().cloned());
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            characters,
            stream,
            scenes: Vec::new(),
            requests: Vec::new(),
            results: BTreeMap::new(),
            pages: Vec::new(),
            warnings: Vec::new(),
            tracker,
            config,
            status: MissionStatus::Planning,
        }
    }

    /// Move to the next lifecycle state.
    pub(crate) fn advance(&mut self, status: MissionStatus) {
        info!(mission = %self.id, from = %self.status, to = %status, "Mission status changed");
        self.status = status;
    }

    /// Number of panels across all scenes.
    pub fn panel_count(&self) -> usize {
        self.scenes.iter().map(|scene| scene.panels.len()).sum()
    }

    /// Counts and failure reasons for reporting.
    pub fn summary(&self) -> MissionSummary {
        let mut succeeded = 0;
        let mut failures = Vec::new();
        let mut provider_successes: BTreeMap<String, usize> = BTreeMap::new();

        for result in self.results.values() {
            match result.status() {
                GenerationStatus::Succeeded => {
                    succeeded += 1;
                    if let Some(provider) = &result.provider_used {
                        *provider_successes.entry(provider.clone()).or_default() += 1;
                    }
                }
                GenerationStatus::Failed => failures.push(PanelFailure {
                    panel_id: result.panel_id,
                    provider: result.provider_used.clone(),
                    reason: result
                        .failure()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                }),
            }
        }

        MissionSummary {
            mission_id: self.id,
            status: self.status,
            characters: self.characters.len(),
            events: self.stream.len(),
            scenes: self.scenes.len(),
            panels: self.panel_count(),
            pages: self.pages.len(),
            succeeded,
            failed: failures.len(),
            failures,
            provider_successes,
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A panel that ended without an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelFailure {
    /// Failed panel
    pub panel_id: PanelId,
    /// Last provider called, if any
    pub provider: Option<String>,
    /// Why the panel failed
    pub reason: String,
}

/// Serializable overview of a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct MissionSummary {
    /// Mission id
    mission_id: Uuid,
    /// Final status
    status: MissionStatus,
    /// Cast size
    characters: usize,
    /// Events after filtering
    events: usize,
    /// Planned scenes
    scenes: usize,
    /// Planned panels
    panels: usize,
    /// Assembled pages
    pages: usize,
    /// Panels with an image
    succeeded: usize,
    /// Panels without an image
    failed: usize,
    /// Why each failed panel failed
    failures: Vec<PanelFailure>,
    /// Successful panels per provider
    provider_successes: BTreeMap<String, usize>,
    /// Assembly warnings
    warnings: Vec<String>,
}

impl std::fmt::Display for MissionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mission {} ({})", self.mission_id, self.status)?;
        writeln!(
            f,
            "  {} events, {} scenes, {} panels, {} pages",
            self.events, self.scenes, self.panels, self.pages
        )?;
        writeln!(f, "  {} succeeded, {} failed", self.succeeded, self.failed)?;
        for (provider, count) in &self.provider_successes {
            writeln!(f, "  {}: {} panels", provider, count)?;
        }
        for failure in &self.failures {
            writeln!(f, "  {} failed: {}", failure.panel_id, failure.reason)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Consumes a finished mission, e.g. to write metadata next to the pages.
///
/// Reporters get read-only access to the mission and the configuration it
/// ran with.
#[async_trait]
pub trait MissionReporter: Send + Sync {
    /// Report a finished mission.
    async fn report(&self, mission: &Mission) -> ComicsmithResult<()>;
}

/// Reporter that logs the mission summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl MissionReporter for TracingReporter {
    async fn report(&self, mission: &Mission) -> ComicsmithResult<()> {
        let summary = mission.summary();
        info!(
            mission = %summary.mission_id,
            status = %summary.status,
            scenes = summary.scenes,
            panels = summary.panels,
            pages = summary.pages,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Mission finished"
        );
        Ok(())
    }
}
