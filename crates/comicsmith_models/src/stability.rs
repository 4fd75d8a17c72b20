//! Stability AI text-to-image client.

use crate::{classify_status, classify_transport};
use async_trait::async_trait;
use comicsmith_core::{GenerationConstraints, ImageQuality, ImageRef};
use comicsmith_error::{BackendError, BackendErrorKind, ProviderError, ProviderErrorKind};
use comicsmith_interface::ImageProvider;
use comicsmith_rate_limit::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

const STABILITY_API_BASE: &str = "https://api.stability.ai/v1/generation";
const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";
const DEFAULT_API_KEY_ENV: &str = "STABILITY_API_KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Debug, Serialize)]
struct StabilityRequest<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: f32,
    width: u32,
    height: u32,
    samples: u32,
    steps: u32,
}

/// One generated artifact in a Stability response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityArtifact {
    /// Base64-encoded PNG
    pub base64: String,
    /// Seed used for generation
    #[serde(default)]
    pub seed: u64,
    /// `SUCCESS`, `CONTENT_FILTERED` or `ERROR`
    pub finish_reason: String,
}

/// Response body of the text-to-image endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StabilityResponse {
    /// Generated artifacts
    pub artifacts: Vec<StabilityArtifact>,
}

impl StabilityResponse {
    /// First successful artifact as an inline image.
    ///
    /// # Errors
    ///
    /// Returns `ContentPolicy` if the artifact was filtered, or
    /// `MalformedResponse` if no artifact is usable.
    pub fn into_image_ref(self) -> Result<ImageRef, ProviderError> {
        let artifact = self.artifacts.into_iter().next().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MalformedResponse(
                "response contained no artifacts".to_string(),
            ))
        })?;

        match artifact.finish_reason.as_str() {
            "SUCCESS" => Ok(ImageRef::Base64 {
                mime_type: "image/png".to_string(),
                data: artifact.base64,
            }),
            "CONTENT_FILTERED" => Err(ProviderError::new(ProviderErrorKind::ContentPolicy(
                "artifact was filtered by the provider".to_string(),
            ))),
            other => Err(ProviderError::new(ProviderErrorKind::MalformedResponse(
                format!("artifact finished with {}", other),
            ))),
        }
    }
}

/// Stability AI text-to-image client.
#[derive(Debug, Clone)]
pub struct StabilityImageClient {
    client: Client,
    api_key: String,
    engine: String,
    base_url: String,
    name: String,
}

impl StabilityImageClient {
    /// Creates a new Stability client for an engine id.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        engine: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                BackendError::new(BackendErrorKind::ClientBuild {
                    provider: "stability".to_string(),
                    message: e.to_string(),
                })
            })?;
        debug!("Creating new Stability image client");
        Ok(Self {
            client,
            api_key: api_key.into(),
            engine: engine.into(),
            base_url: STABILITY_API_BASE.to_string(),
            name: "stability".to_string(),
        })
    }

    /// Creates a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key variable is unset or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, BackendError> {
        let key_env = config.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        let api_key = std::env::var(key_env).map_err(|_| {
            BackendError::new(BackendErrorKind::MissingApiKey {
                provider: config.name.clone(),
                env_var: key_env.to_string(),
            })
        })?;
        let engine = config.model.as_deref().unwrap_or(DEFAULT_ENGINE);

        let mut client = Self::new(api_key, engine)?;
        if let Some(endpoint) = &config.endpoint {
            client.base_url = endpoint.trim_end_matches('/').to_string();
        }
        if !config.name.is_empty() {
            client.name = config.name.clone();
        }
        Ok(client)
    }

    /// Engine identifier.
    pub fn model_name(&self) -> &str {
        &self.engine
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/text-to-image", self.base_url, self.engine)
    }
}

#[async_trait]
impl ImageProvider for StabilityImageClient {
    #[instrument(skip(self, prompt, constraints), fields(provider = %self.name, engine = %self.engine))]
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError> {
        let steps = match constraints.quality {
            ImageQuality::Standard => 30,
            ImageQuality::Hd => 50,
        };
        let request = StabilityRequest {
            text_prompts: vec![TextPrompt {
                text: prompt,
                weight: 1.0,
            }],
            cfg_scale: 7.0,
            width: constraints.size.width,
            height: constraints.size.height,
            samples: 1,
            steps,
        };
        debug!(prompt_chars = prompt.len(), steps, "Sending text-to-image request to Stability");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send request to Stability");
                classify_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Stability returned error");
            return Err(classify_status(
                status.as_u16(),
                retry_after.as_deref(),
                &body,
            ));
        }

        let parsed: StabilityResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse Stability response");
            ProviderError::new(ProviderErrorKind::MalformedResponse(e.to_string()))
        })?;

        parsed.into_image_ref().inspect_err(|e| {
            warn!(error = %e, "Stability response carried no usable image");
        })
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
