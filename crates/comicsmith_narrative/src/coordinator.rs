//! Concurrent image generation with retry, fallback and cancellation.
//!
//! Requests are dispatched in input order onto a bounded pool of tokio
//! tasks. Each task walks the fallback chain: transient failures are retried
//! against the same provider with jittered exponential backoff (or the
//! provider's `Retry-After`, capped at the backoff ceiling), anything
//! else (or an exhausted retry budget) moves on to the next provider.
//! Results are keyed by panel id and written once, so completion order never
//! matters.

use crate::RunCancellation;
use comicsmith_core::{FailureReason, GenerationRequest, GenerationResult, GenerationStatus, PanelId};
use comicsmith_error::RetryableError;
use comicsmith_interface::ImageProvider;
use comicsmith_rate_limit::{GenerationConfig, ProviderConfig, RateLimiter};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, error, info, instrument, warn};

/// One provider in the fallback chain with its quota and retry policy.
///
/// The rate limiter is shared by every worker that calls this provider.
#[derive(Clone)]
pub struct ProviderEntry {
    provider: Arc<dyn ImageProvider>,
    limiter: RateLimiter<ProviderConfig>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name())
            .field("policy", self.policy())
            .finish()
    }
}

impl ProviderEntry {
    /// Pair a provider with its configuration.
    ///
    /// An empty configured name is replaced by the provider's own name.
    pub fn new(provider: Arc<dyn ImageProvider>, mut config: ProviderConfig) -> Self {
        if config.name.is_empty() {
            config.name = provider.provider_name().to_string();
        }
        Self {
            provider,
            limiter: RateLimiter::new(config),
        }
    }

    /// Provider name used for attribution.
    pub fn name(&self) -> &str {
        &self.limiter.inner().name
    }

    /// Quota and retry policy.
    pub fn policy(&self) -> &ProviderConfig {
        self.limiter.inner()
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let policy = self.policy();
        // from_millis(2) doubles each step; the factor sets the first delay
        ExponentialBackoff::from_millis(2)
            .factor((policy.initial_backoff_ms / 2).max(1))
            .max_delay(policy.max_backoff())
            .map(jitter)
            .take(policy.retry_budget.saturating_sub(1) as usize)
    }
}

/// Ordered providers tried for each request.
///
/// Cloning is cheap; clones share providers and rate limiters.
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    entries: Arc<[ProviderEntry]>,
}

impl FallbackChain {
    /// Build a chain, first entry tried first.
    pub fn new(entries: Vec<ProviderEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Entries in fallback order.
    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Drives generation requests to terminal results.
#[derive(Debug, Clone, Default)]
pub struct GenerationCoordinator {
    config: GenerationConfig,
}

impl GenerationCoordinator {
    /// Create a coordinator with a worker pool and cancellation policy.
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Run every request to a terminal result.
    ///
    /// The returned map holds one result per distinct input panel id:
    /// succeeded, failed after exhausting the chain, or failed as cancelled
    /// when the run was cancelled before the request was dispatched or
    /// finished within the grace period.
    #[instrument(skip_all, fields(requests = requests.len(), providers = chain.len()))]
    pub async fn run(
        &self,
        requests: Vec<GenerationRequest>,
        chain: &FallbackChain,
        cancellation: &RunCancellation,
    ) -> BTreeMap<PanelId, GenerationResult> {
        let mut results = BTreeMap::new();

        if chain.is_empty() {
            warn!("Fallback chain is empty, failing every request");
            for request in requests {
                record(
                    &mut results,
                    GenerationResult::failed(
                        request.panel_id,
                        FailureReason::NoProviders,
                        None,
                        0,
                        0,
                    ),
                );
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let mut tasks: JoinSet<GenerationResult> = JoinSet::new();
        let mut in_flight: HashMap<Id, PanelId> = HashMap::new();
        let mut dispatched: Vec<PanelId> = Vec::new();
        let mut cancelled = false;

        let mut pending = requests.into_iter();
        for request in pending.by_ref() {
            while let Some(joined) = tasks.try_join_next_with_id() {
                collect(joined, &in_flight, &mut results);
            }

            let permit = tokio::select! {
                biased;
                _ = cancellation.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                cancelled = true;
                record(&mut results, GenerationResult::cancelled(request.panel_id));
                break;
            };

            let panel_id = request.panel_id;
            debug!(%panel_id, "Dispatching request");
            let chain = chain.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                generate_with_fallback(&chain, request).await
            });
            in_flight.insert(handle.id(), panel_id);
            dispatched.push(panel_id);
        }

        if cancelled {
            for request in pending {
                record(&mut results, GenerationResult::cancelled(request.panel_id));
            }
        } else {
            loop {
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    joined = tasks.join_next_with_id() => match joined {
                        Some(joined) => collect(joined, &in_flight, &mut results),
                        None => break,
                    },
                }
            }
        }

        if cancelled && !tasks.is_empty() {
            let grace = self.config.cancellation_grace();
            info!(
                in_flight = tasks.len(),
                grace_ms = grace.as_millis() as u64,
                "Run cancelled, waiting for in-flight requests"
            );
            let drained = tokio::time::timeout(grace, async {
                while let Some(joined) = tasks.join_next_with_id().await {
                    collect(joined, &in_flight, &mut results);
                }
            })
            .await;
            if drained.is_err() {
                warn!(abandoned = tasks.len(), "Grace period elapsed, abandoning in-flight requests");
                tasks.abort_all();
                while let Some(joined) = tasks.join_next_with_id().await {
                    collect(joined, &in_flight, &mut results);
                }
            }
        }

        for panel_id in dispatched {
            if !results.contains_key(&panel_id) {
                record(&mut results, GenerationResult::cancelled(panel_id));
            }
        }

        let succeeded = results
            .values()
            .filter(|r| r.status() == GenerationStatus::Succeeded)
            .count();
        info!(
            succeeded,
            failed = results.len() - succeeded,
            cancelled,
            "Generation run finished"
        );
        results
    }
}

fn record(results: &mut BTreeMap<PanelId, GenerationResult>, result: GenerationResult) {
    if results.contains_key(&result.panel_id) {
        warn!(panel_id = %result.panel_id, "Duplicate result ignored");
        return;
    }
    results.insert(result.panel_id, result);
}

fn collect(
    joined: Result<(Id, GenerationResult), JoinError>,
    in_flight: &HashMap<Id, PanelId>,
    results: &mut BTreeMap<PanelId, GenerationResult>,
) {
    match joined {
        Ok((_, result)) => record(results, result),
        Err(e) => {
            let Some(panel_id) = in_flight.get(&e.id()).copied() else {
                error!(error = %e, "Worker finished without a known panel");
                return;
            };
            let result = if e.is_cancelled() {
                GenerationResult::cancelled(panel_id)
            } else {
                error!(%panel_id, error = %e, "Worker aborted");
                GenerationResult::failed(panel_id, FailureReason::Aborted(e.to_string()), None, 0, 0)
            };
            record(results, result);
        }
    }
}

#[instrument(skip_all, fields(panel_id = %request.panel_id))]
async fn generate_with_fallback(chain: &FallbackChain, request: GenerationRequest) -> GenerationResult {
    let mut total_attempts = 0;
    let mut last_error = String::new();
    let mut last_provider = None;
    let mut last_attempts = 0;

    for entry in chain.entries() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let request = &request;
        // Server-requested wait from the last failure, consumed by the next delay
        let retry_hint: Mutex<Option<Duration>> = Mutex::new(None);
        let hint = &retry_hint;
        let max_backoff = entry.policy().max_backoff();
        let delays = entry.backoff().map(|computed| {
            let requested = hint.lock().ok().and_then(|mut pending| pending.take());
            match requested {
                Some(requested) => {
                    let wait = requested.min(max_backoff);
                    debug!(provider = entry.name(), wait_ms = wait.as_millis() as u64, "Honoring Retry-After");
                    wait
                }
                None => computed,
            }
        });

        let outcome = Retry::spawn(delays, move || async move {
            let _guard = entry.limiter.acquire().await;
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(provider = entry.name(), attempt, "Calling provider");

            match entry
                .provider
                .generate(&request.prompt_text, &request.constraints)
                .await
            {
                Ok(image) => Ok(image),
                Err(e) if e.is_retryable() => {
                    warn!(provider = entry.name(), attempt, error = %e.kind, "Transient provider failure");
                    if let Ok(mut pending) = hint.lock() {
                        *pending = e.retry_after();
                    }
                    Err(RetryError::Transient {
                        retry_after: e.retry_after(),
                        err: e,
                    })
                }
                Err(e) => {
                    warn!(provider = entry.name(), attempt, error = %e.kind, "Permanent provider failure");
                    Err(RetryError::Permanent(e))
                }
            }
        })
        .await;

        let made = counter.load(Ordering::Relaxed);
        total_attempts += made;
        match outcome {
            Ok(image) => {
                debug!(provider = entry.name(), attempts = made, "Panel generated");
                return GenerationResult::succeeded(
                    request.panel_id,
                    image,
                    entry.name(),
                    made,
                    total_attempts,
                );
            }
            Err(e) => {
                warn!(provider = entry.name(), attempts = made, error = %e.kind, "Falling back to next provider");
                last_error = e.kind.to_string();
                last_provider = Some(entry.name().to_string());
                last_attempts = made;
            }
        }
    }

    error!(total_attempts, error = %last_error, "All providers exhausted");
    GenerationResult::failed(
        request.panel_id,
        FailureReason::Exhausted { last_error },
        last_provider,
        last_attempts,
        total_attempts,
    )
}
