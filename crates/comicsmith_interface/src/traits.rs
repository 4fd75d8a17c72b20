//! Trait definitions for image backends and transcript sources.

use crate::Transcript;
use async_trait::async_trait;
use comicsmith_core::{GenerationConstraints, ImageRef};
use comicsmith_error::{ComicsmithResult, ProviderError};
use std::sync::Arc;

/// Core trait that every image-generation backend implements.
///
/// Errors carry a [`comicsmith_error::ProviderErrorKind`] that tells the
/// coordinator whether retrying the same backend can help.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image for a fully self-contained prompt.
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError>;

    /// Provider name used for rate limiting, logging and result attribution.
    fn provider_name(&self) -> &str;
}

#[async_trait]
impl<P: ImageProvider + ?Sized> ImageProvider for Arc<P> {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError> {
        (**self).generate(prompt, constraints).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }
}

/// Ingestion collaborator supplying the mission cast and raw events.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Load the transcript.
    async fn load(&self) -> ComicsmithResult<Transcript>;
}
