//! The closed set of image backends the coordinator can drive.

use async_trait::async_trait;
use comicsmith_core::{GenerationConstraints, ImageRef};
use comicsmith_error::{ComicsmithResult, ConfigError, ProviderError};
use comicsmith_interface::ImageProvider;
use comicsmith_rate_limit::ProviderConfig;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "openai")]
use crate::OpenAiImageClient;

#[cfg(feature = "stability")]
use crate::StabilityImageClient;

/// An image backend in the fallback chain.
///
/// # Examples
///
/// ```
/// use comicsmith_interface::ImageProvider;
/// use comicsmith_models::ProviderBackend;
/// # use async_trait::async_trait;
/// # use comicsmith_core::{GenerationConstraints, ImageRef};
/// # use comicsmith_error::ProviderError;
/// # struct Fixed;
/// # #[async_trait]
/// # impl ImageProvider for Fixed {
/// #     async fn generate(&self, _: &str, _: &GenerationConstraints) -> Result<ImageRef, ProviderError> {
/// #         Ok(ImageRef::Url("https://example.com/1.png".into()))
/// #     }
/// #     fn provider_name(&self) -> &str { "fixed" }
/// # }
///
/// let backend = ProviderBackend::custom(Fixed);
/// assert_eq!(backend.provider_name(), "fixed");
/// ```
#[derive(Clone)]
pub enum ProviderBackend {
    /// OpenAI image generation
    #[cfg(feature = "openai")]
    OpenAi(OpenAiImageClient),
    /// Stability text-to-image
    #[cfg(feature = "stability")]
    Stability(StabilityImageClient),
    /// Caller-supplied provider
    Custom(Arc<dyn ImageProvider>),
}

impl std::fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProviderBackend")
            .field(&self.provider_name())
            .finish()
    }
}

impl ProviderBackend {
    /// Wrap a caller-supplied provider.
    pub fn custom(provider: impl ImageProvider + 'static) -> Self {
        ProviderBackend::Custom(Arc::new(provider))
    }

    /// Build the HTTP backend named by a provider configuration.
    ///
    /// The backend is chosen from the provider name (`openai`, `stability`).
    ///
    /// # Errors
    ///
    /// Returns an error if the name has no compiled-in backend or the client
    /// cannot be created.
    pub fn from_config(config: &ProviderConfig) -> ComicsmithResult<Self> {
        debug!(provider = %config.name, "Building provider backend");
        match config.name.as_str() {
            #[cfg(feature = "openai")]
            "openai" => Ok(ProviderBackend::OpenAi(OpenAiImageClient::from_config(
                config,
            )?)),
            #[cfg(feature = "stability")]
            "stability" => Ok(ProviderBackend::Stability(
                StabilityImageClient::from_config(config)?,
            )),
            other => Err(ConfigError::invalid(
                format!("providers.{}", other),
                "has no image backend in this build",
            )
            .into()),
        }
    }

    fn as_provider(&self) -> &dyn ImageProvider {
        match self {
            #[cfg(feature = "openai")]
            ProviderBackend::OpenAi(client) => client,
            #[cfg(feature = "stability")]
            ProviderBackend::Stability(client) => client,
            ProviderBackend::Custom(provider) => provider.as_ref(),
        }
    }
}

#[async_trait]
impl ImageProvider for ProviderBackend {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError> {
        self.as_provider().generate(prompt, constraints).await
    }

    fn provider_name(&self) -> &str {
        self.as_provider().provider_name()
    }
}
