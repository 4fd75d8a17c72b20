//! Transcript ingestion from a JSON document.

use async_trait::async_trait;
use comicsmith_error::{ComicsmithResult, PipelineError, PipelineErrorKind};
use comicsmith_interface::{Transcript, TranscriptSource};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Reads a `{ "characters": [...], "events": [...] }` document from disk.
///
/// `characters` may be omitted. Events are taken in file order; the
/// pipeline sorts them by timestamp.
#[derive(Debug, Clone)]
pub struct JsonTranscriptSource {
    path: PathBuf,
}

impl JsonTranscriptSource {
    /// Source reading the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Transcript file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptSource for JsonTranscriptSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> ComicsmithResult<Transcript> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PipelineError::new(PipelineErrorKind::Ingestion(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            )))
        })?;
        let transcript: Transcript = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::new(PipelineErrorKind::Ingestion(format!(
                "invalid transcript {}: {}",
                self.path.display(),
                e
            )))
        })?;
        debug!(
            characters = transcript.characters.len(),
            events = transcript.events.len(),
            "Loaded transcript"
        );
        Ok(transcript)
    }
}
