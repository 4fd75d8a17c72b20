//! Generation requests and results exchanged with the coordinator.

use crate::{CharacterId, PanelId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{}x{}", width, height)]
pub struct ImageSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

/// Requested rendering quality.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageQuality {
    /// Provider default quality
    #[default]
    Standard,
    /// Highest available quality
    Hd,
}

/// Visual constraints a provider must honour for one panel.
///
/// # Examples
///
/// ```
/// use comicsmith_core::{GenerationConstraintsBuilder, ImageQuality};
///
/// let constraints = GenerationConstraintsBuilder::default()
///     .style("ink and watercolor")
///     .quality(ImageQuality::Hd)
///     .build()
///     .unwrap();
/// assert_eq!(constraints.size.width, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into), default)]
pub struct GenerationConstraints {
    /// Output dimensions
    pub size: ImageSize,
    /// Rendering quality
    pub quality: ImageQuality,
    /// Overall art style
    pub style: String,
    /// Effective description of every character in the panel
    pub character_sheets: BTreeMap<CharacterId, String>,
}

impl Default for GenerationConstraints {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            quality: ImageQuality::default(),
            style: "comic book art".to_string(),
            character_sheets: BTreeMap::new(),
        }
    }
}

/// A self-contained request to illustrate one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Panel this request illustrates
    pub panel_id: PanelId,
    /// Full text prompt
    pub prompt_text: String,
    /// Visual constraints
    pub constraints: GenerationConstraints,
    /// Provider calls made for this request across the fallback chain.
    ///
    /// 0 on submission; the pipeline fills it in from the matching result.
    pub attempt_count: u32,
}

impl GenerationRequest {
    /// Create a fresh request for a panel.
    pub fn new(
        panel_id: PanelId,
        prompt_text: impl Into<String>,
        constraints: GenerationConstraints,
    ) -> Self {
        Self {
            panel_id,
            prompt_text: prompt_text.into(),
            constraints,
            attempt_count: 0,
        }
    }
}

/// Where a generated image can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    /// Hosted image URL
    Url(String),
    /// Inline image data
    Base64 {
        /// MIME type of the data
        mime_type: String,
        /// Base64-encoded bytes
        data: String,
    },
}

/// Why a panel has no image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Every provider in the fallback chain gave up
    #[display("all providers exhausted: {}", last_error)]
    Exhausted {
        /// Error reported by the last provider attempt
        last_error: String,
    },
    /// The run was cancelled before the request completed
    #[display("cancelled")]
    Cancelled,
    /// The fallback chain was empty
    #[display("no providers configured")]
    NoProviders,
    /// The worker executing the request died
    #[display("worker aborted: {}", _0)]
    Aborted(String),
}

/// Terminal status of a request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationStatus {
    /// An image was produced
    Succeeded,
    /// No image was produced
    Failed,
}

/// Image or failure for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// The provider returned an image
    Succeeded(ImageRef),
    /// The request failed terminally
    Failed(FailureReason),
}

/// Terminal result of one generation request, keyed by panel id.
///
/// # Examples
///
/// ```
/// use comicsmith_core::{GenerationResult, GenerationStatus, PanelId};
///
/// let result = GenerationResult::cancelled(PanelId::new(1, 1));
/// assert_eq!(result.status(), GenerationStatus::Failed);
/// assert_eq!(result.attempts, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Panel the result belongs to
    pub panel_id: PanelId,
    /// Image or failure reason
    pub outcome: GenerationOutcome,
    /// Provider that produced the final outcome, if any was called
    pub provider_used: Option<String>,
    /// Attempts made against `provider_used`
    pub attempts: u32,
    /// Attempts made across the whole fallback chain
    pub total_attempts: u32,
}

impl GenerationResult {
    /// A successful result.
    pub fn succeeded(
        panel_id: PanelId,
        image: ImageRef,
        provider: impl Into<String>,
        attempts: u32,
        total_attempts: u32,
    ) -> Self {
        Self {
            panel_id,
            outcome: GenerationOutcome::Succeeded(image),
            provider_used: Some(provider.into()),
            attempts,
            total_attempts,
        }
    }

    /// A terminal failure.
    pub fn failed(
        panel_id: PanelId,
        reason: FailureReason,
        provider: Option<String>,
        attempts: u32,
        total_attempts: u32,
    ) -> Self {
        Self {
            panel_id,
            outcome: GenerationOutcome::Failed(reason),
            provider_used: provider,
            attempts,
            total_attempts,
        }
    }

    /// A request that was never dispatched, or abandoned, because the run was cancelled.
    pub fn cancelled(panel_id: PanelId) -> Self {
        Self::failed(panel_id, FailureReason::Cancelled, None, 0, 0)
    }

    /// Terminal status.
    pub fn status(&self) -> GenerationStatus {
        match self.outcome {
            GenerationOutcome::Succeeded(_) => GenerationStatus::Succeeded,
            GenerationOutcome::Failed(_) => GenerationStatus::Failed,
        }
    }

    /// Generated image, when the request succeeded.
    pub fn image(&self) -> Option<&ImageRef> {
        match &self.outcome {
            GenerationOutcome::Succeeded(image) => Some(image),
            GenerationOutcome::Failed(_) => None,
        }
    }

    /// Failure reason, when the request failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            GenerationOutcome::Succeeded(_) => None,
            GenerationOutcome::Failed(reason) => Some(reason),
        }
    }

    /// Whether the failure was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure(), Some(FailureReason::Cancelled))
    }
}
