//! Image generation provider integrations for Comicsmith.
//!
//! Each HTTP backend lives behind its own feature flag. All of them are
//! reachable through the closed [`ProviderBackend`] set, which implements
//! [`comicsmith_interface::ImageProvider`] and can also wrap a caller-supplied
//! provider.
//!
//! # Available Providers
//!
//! - **OpenAI** image generation - Enable with `openai` feature
//! - **Stability** text-to-image - Enable with `stability` feature
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "openai")]
//! # {
//! use comicsmith_core::GenerationConstraints;
//! use comicsmith_interface::ImageProvider;
//! use comicsmith_models::OpenAiImageClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiImageClient::new(std::env::var("OPENAI_API_KEY")?, "dall-e-3")?;
//! let image = client
//!     .generate("a ranger on a cliff at dawn", &GenerationConstraints::default())
//!     .await?;
//! # Ok(())
//! # }
//! # }
//! ```

mod backend;
mod classify;

pub use backend::ProviderBackend;
pub use classify::{classify_status, classify_transport, parse_retry_after};

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "stability")]
mod stability;

#[cfg(feature = "openai")]
pub use openai::{OpenAiImageClient, OpenAiImageData, OpenAiImageResponse};

#[cfg(feature = "stability")]
pub use stability::{StabilityArtifact, StabilityImageClient, StabilityResponse};
