//! End-to-end mission execution.

use crate::{
    DeltaExtractor, FallbackChain, GenerationCoordinator, Mission, MissionReporter, MissionStatus,
    PageAssembler, PromptBuilder, RunCancellation, ScenePlanner,
};
use comicsmith_core::EventStream;
use comicsmith_error::{ComicsmithResult, PipelineError, PipelineErrorKind};
use comicsmith_interface::{Transcript, TranscriptSource};
use comicsmith_rate_limit::ComicsmithConfig;
use tracing::{debug, info, instrument};

/// Sequences planning, prompting, generation and assembly into a mission.
///
/// Planning, prompting (with continuity commits) and assembly run in order on
/// the calling task; only generation fans out.
///
/// # Example
///
/// ```rust,ignore
/// use comicsmith_narrative::{ComicPipeline, FallbackChain, RunCancellation};
///
/// let pipeline = ComicPipeline::new(config, chain)?;
/// let mission = pipeline.run(transcript, &RunCancellation::new()).await?;
/// println!("{}", mission.summary());
/// ```
pub struct ComicPipeline {
    config: ComicsmithConfig,
    planner: ScenePlanner,
    prompts: PromptBuilder,
    extractor: DeltaExtractor,
    coordinator: GenerationCoordinator,
    assembler: PageAssembler,
    chain: FallbackChain,
    reporters: Vec<Box<dyn MissionReporter>>,
}

impl std::fmt::Debug for ComicPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComicPipeline")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("reporters", &self.reporters.len())
            .finish()
    }
}

impl ComicPipeline {
    /// Build every stage from one configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a planner marker
    /// fails to compile.
    pub fn new(config: ComicsmithConfig, chain: FallbackChain) -> ComicsmithResult<Self> {
        config.validate()?;
        Ok(Self {
            planner: ScenePlanner::new(config.planner.clone())?,
            prompts: PromptBuilder::new(config.style.clone()),
            extractor: DeltaExtractor::new()?,
            coordinator: GenerationCoordinator::new(config.generation.clone()),
            assembler: PageAssembler::new(config.layout.clone()),
            chain,
            reporters: Vec::new(),
            config,
        })
    }

    /// Add a reporter that receives every finished mission.
    pub fn with_reporter(mut self, reporter: Box<dyn MissionReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ComicsmithConfig {
        &self.config
    }

    /// Providers tried for each panel.
    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Ingest and segment a transcript without generating anything.
    ///
    /// The returned mission stays in the planning state.
    ///
    /// # Errors
    ///
    /// Returns segmentation errors and panels referencing unknown characters.
    #[instrument(skip_all, fields(events = transcript.events.len()))]
    pub fn plan(&self, transcript: Transcript) -> ComicsmithResult<Mission> {
        let stream = EventStream::new(transcript.events)?.filtered(&self.config.planner.filter)?;
        let mut mission = Mission::new(transcript.characters, stream, self.config.clone());
        mission.scenes = self.planner.plan(&mission.stream, &mission.characters)?;
        check_cast(&mission)?;
        info!(
            mission = %mission.id,
            scenes = mission.scenes.len(),
            panels = mission.panel_count(),
            "Planned mission"
        );
        Ok(mission)
    }

    /// Load a transcript from a source and run it.
    ///
    /// # Errors
    ///
    /// Returns ingestion failures plus everything [`ComicPipeline::run`] returns.
    pub async fn run_source(
        &self,
        source: &dyn TranscriptSource,
        cancellation: &RunCancellation,
    ) -> ComicsmithResult<Mission> {
        let transcript = source.load().await?;
        self.run(transcript, cancellation).await
    }

    /// Turn a transcript into assembled pages.
    ///
    /// Provider failures never fail the run; they show up as failed results
    /// and placeholder slots. A cancelled run still assembles whatever
    /// finished and ends `Aborted`.
    ///
    /// # Errors
    ///
    /// Returns segmentation and continuity errors, which abort the run
    /// before any page is assembled, and reporter failures.
    #[instrument(skip_all, fields(events = transcript.events.len(), providers = self.chain.len()))]
    pub async fn run(
        &self,
        transcript: Transcript,
        cancellation: &RunCancellation,
    ) -> ComicsmithResult<Mission> {
        let mut mission = self.plan(transcript)?;

        mission.advance(MissionStatus::Prompting);
        for scene in &mission.scenes {
            for panel in &scene.panels {
                let request = self.prompts.build(scene, panel, &mission.tracker)?;
                mission.requests.push(request);
                for (character, delta) in self.extractor.extract(panel, &mission.stream) {
                    mission.tracker.commit(&character, delta, panel.id)?;
                }
            }
        }
        debug!(requests = mission.requests.len(), "Prompts built");

        mission.advance(MissionStatus::Generating);
        mission.results = self
            .coordinator
            .run(mission.requests.clone(), &self.chain, cancellation)
            .await;
        for request in &mut mission.requests {
            if let Some(result) = mission.results.get(&request.panel_id) {
                request.attempt_count = result.total_attempts;
            }
        }

        mission.advance(MissionStatus::Assembling);
        let assembly = self.assembler.assemble(&mission.scenes, &mission.results);
        mission.pages = assembly.pages;
        mission.warnings = assembly.warnings;

        mission.advance(if cancellation.is_cancelled() {
            MissionStatus::Aborted
        } else {
            MissionStatus::Completed
        });

        for reporter in &self.reporters {
            reporter.report(&mission).await?;
        }
        Ok(mission)
    }
}

fn check_cast(mission: &Mission) -> Result<(), PipelineError> {
    for panel in mission.scenes.iter().flat_map(|scene| &scene.panels) {
        for character in &panel.characters_present {
            if mission.tracker.character(character).is_none() {
                return Err(PipelineError::new(PipelineErrorKind::MissingCharacter {
                    panel: panel.id.to_string(),
                    character: character.to_string(),
                }));
            }
        }
    }
    Ok(())
}
