//! OpenAI image generation client.

use crate::{classify_status, classify_transport};
use async_trait::async_trait;
use comicsmith_core::{GenerationConstraints, ImageQuality, ImageRef};
use comicsmith_error::{BackendError, BackendErrorKind, ProviderError, ProviderErrorKind};
use comicsmith_interface::ImageProvider;
use comicsmith_rate_limit::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const DEFAULT_MODEL: &str = "dall-e-3";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    quality: &'static str,
    response_format: &'static str,
}

/// One generated image in an OpenAI response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenAiImageData {
    /// Hosted image URL
    pub url: Option<String>,
    /// Inline PNG data
    pub b64_json: Option<String>,
    /// Prompt after the provider's own rewriting
    pub revised_prompt: Option<String>,
}

/// Response body of `/v1/images/generations`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenAiImageResponse {
    /// Generated images
    pub data: Vec<OpenAiImageData>,
}

impl OpenAiImageResponse {
    /// First usable image in the response.
    ///
    /// # Errors
    ///
    /// Returns `MalformedResponse` if no image carries a URL or inline data.
    pub fn into_image_ref(self) -> Result<ImageRef, ProviderError> {
        let first = self.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MalformedResponse(
                "response contained no images".to_string(),
            ))
        })?;

        match (first.url, first.b64_json) {
            (Some(url), _) => Ok(ImageRef::Url(url)),
            (None, Some(data)) => Ok(ImageRef::Base64 {
                mime_type: "image/png".to_string(),
                data,
            }),
            (None, None) => Err(ProviderError::new(ProviderErrorKind::MalformedResponse(
                "image entry had neither url nor b64_json".to_string(),
            ))),
        }
    }
}

/// OpenAI image generation client.
#[derive(Debug, Clone)]
pub struct OpenAiImageClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    name: String,
}

impl OpenAiImageClient {
    /// Creates a new OpenAI image client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model identifier (e.g., "dall-e-3")
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                BackendError::new(BackendErrorKind::ClientBuild {
                    provider: "openai".to_string(),
                    message: e.to_string(),
                })
            })?;
        debug!("Creating new OpenAI image client");
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_IMAGES_URL.to_string(),
            name: "openai".to_string(),
        })
    }

    /// Creates a client from provider configuration, reading the API key
    /// from the configured environment variable.
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
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let mut client = Self::new(api_key, model)?;
        if let Some(endpoint) = &config.endpoint {
            client.endpoint = endpoint.clone();
        }
        if !config.name.is_empty() {
            client.name = config.name.clone();
        }
        Ok(client)
    }

    /// Model identifier.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(
        &'a self,
        prompt: &'a str,
        constraints: &GenerationConstraints,
    ) -> OpenAiImageRequest<'a> {
        OpenAiImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: constraints.size.to_string(),
            quality: match constraints.quality {
                ImageQuality::Standard => "standard",
                ImageQuality::Hd => "hd",
            },
            response_format: "url",
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageClient {
    #[instrument(skip(self, prompt, constraints), fields(provider = %self.name, model = %self.model))]
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError> {
        debug!(prompt_chars = prompt.len(), size = %constraints.size, "Sending image request to OpenAI");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt, constraints))
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send request to OpenAI");
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
            error!(status = %status, body = %body, "OpenAI returned error");
            return Err(classify_status(
                status.as_u16(),
                retry_after.as_deref(),
                &body,
            ));
        }

        let parsed: OpenAiImageResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse OpenAI response");
            ProviderError::new(ProviderErrorKind::MalformedResponse(e.to_string()))
        })?;

        parsed.into_image_ref()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
