//! Run and plan command handlers.

use comicsmith::{
    ComicPipeline, ComicsmithConfig, ComicsmithResult, FallbackChain, JsonTranscriptSource,
    RunCancellation, TranscriptSource, build_fallback_chain,
};
use std::path::Path;
use tracing::{info, warn};

fn load_config(path: Option<&Path>) -> ComicsmithResult<ComicsmithConfig> {
    match path {
        Some(path) => ComicsmithConfig::from_file(path),
        None => ComicsmithConfig::load(),
    }
}

/// Run the full pipeline on a transcript file and print the summary.
///
/// Ctrl-C stops dispatching new panels; panels already in flight get the
/// configured grace period before the run is reported as aborted.
pub async fn run_transcript(
    transcript: &Path,
    config: Option<&Path>,
    json: bool,
) -> ComicsmithResult<()> {
    let config = load_config(config)?;
    let chain = build_fallback_chain(&config)?;
    let pipeline = ComicPipeline::new(config, chain)?;

    let cancellation = RunCancellation::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight panels");
            on_interrupt.cancel();
        }
    });

    let source = JsonTranscriptSource::new(transcript);
    let mission = pipeline.run_source(&source, &cancellation).await?;
    info!(mission_id = %mission.id, status = %mission.status, "Mission finished");

    print_summary(&mission.summary(), json);
    Ok(())
}

/// Segment a transcript and print the scene and panel breakdown.
///
/// No provider is contacted, so no API keys are needed.
pub async fn plan_transcript(transcript: &Path, config: Option<&Path>) -> ComicsmithResult<()> {
    let config = load_config(config)?;
    let pipeline = ComicPipeline::new(config, FallbackChain::default())?;

    let transcript = JsonTranscriptSource::new(transcript).load().await?;
    let mission = pipeline.plan(transcript)?;

    for scene in &mission.scenes {
        println!(
            "Scene {} (events {}..{}, tension {:.2}){}",
            scene.ordinal,
            scene.event_range.start,
            scene.event_range.end,
            scene.tension,
            scene
                .location_hint
                .as_deref()
                .map(|hint| format!(" - {}", hint))
                .unwrap_or_default()
        );
        for panel in &scene.panels {
            println!("  {} [{}] {}", panel.id, panel.kind, panel.action_summary);
        }
    }
    println!(
        "{} scenes, {} panels",
        mission.scenes.len(),
        mission.panel_count()
    );
    Ok(())
}

fn print_summary(summary: &comicsmith::MissionSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => warn!(error = %e, "Failed to serialize summary"),
        }
    } else {
        println!("{}", summary);
    }
}
