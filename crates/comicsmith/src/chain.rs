//! Fallback chain construction from configuration.

use comicsmith_error::ComicsmithResult;
use comicsmith_models::ProviderBackend;
use comicsmith_narrative::{FallbackChain, ProviderEntry};
use comicsmith_rate_limit::ComicsmithConfig;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Build the provider chain named by `generation.fallback_order`.
///
/// Each entry gets the HTTP backend matching its provider name and keeps its
/// configuration section as retry and quota policy.
///
/// # Errors
///
/// Returns an error if the fallback order names an unconfigured provider, a
/// provider has no compiled-in backend, or a backend cannot be created (for
/// example when its API key variable is unset).
#[instrument(skip(config), fields(order = ?config.generation.fallback_order))]
pub fn build_fallback_chain(config: &ComicsmithConfig) -> ComicsmithResult<FallbackChain> {
    let mut entries = Vec::new();
    for provider in config.fallback_providers()? {
        let backend = ProviderBackend::from_config(&provider)?;
        debug!(provider = %provider.name, "Added provider to fallback chain");
        entries.push(ProviderEntry::new(Arc::new(backend), provider));
    }
    Ok(FallbackChain::new(entries))
}
