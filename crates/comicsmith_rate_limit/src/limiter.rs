//! Rate limiter implementation using governor and Tokio Semaphore.
//!
//! - Governor (GCRA) enforces the provider's requests-per-window quota
//! - A Tokio semaphore enforces the provider's concurrency cap
//!
//! Both are shared by every worker that talks to the provider, so the quota
//! is respected no matter how many coordinator workers are in flight.

use crate::Tier;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter for one provider.
///
/// The limiter takes ownership of a value implementing [`Tier`] and
/// configures itself from it. Clones share the same underlying quota.
///
/// # Example
///
/// ```rust,ignore
/// use comicsmith_rate_limit::{ProviderConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(ProviderConfig::default());
/// let guard = limiter.acquire().await;
/// // call the provider...
/// drop(guard); // releases the concurrency slot
/// ```
pub struct RateLimiter<T: Tier> {
    inner: Arc<T>,

    // Requests per window
    window_limiter: Option<Arc<DirectRateLimiter>>,

    // Concurrent request cap
    concurrent_semaphore: Option<Arc<Semaphore>>,
}

impl<T: Tier> Clone for RateLimiter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            window_limiter: self.window_limiter.clone(),
            concurrent_semaphore: self.concurrent_semaphore.clone(),
        }
    }
}

impl<T: Tier> RateLimiter<T> {
    /// Create a new rate limiter from a tier.
    ///
    /// A quota of `n` requests per window `w` admits one request every
    /// `w / n` with no burst, so no span of length `w` ever sees more than
    /// `n` admissions.
    pub fn new(tier: T) -> Self {
        let window = tier.window();
        let window_limiter = tier.requests_per_window().and_then(|requests| {
            let period = window.checked_div(requests)?;
            let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
            Some(Arc::new(GovernorRateLimiter::direct(quota)))
        });

        let concurrent_semaphore = tier
            .max_concurrent()
            .filter(|max| *max > 0)
            .map(|max| Arc::new(Semaphore::new(max as usize)));

        debug!(
            tier = tier.name(),
            requests_per_window = ?tier.requests_per_window(),
            window_secs = window.as_secs_f64(),
            max_concurrent = ?tier.max_concurrent(),
            "Configured provider rate limiter"
        );

        Self {
            inner: Arc::new(tier),
            window_limiter,
            concurrent_semaphore,
        }
    }

    /// Get a reference to the inner tier value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Wait until the provider's quota admits one more request.
    ///
    /// The window quota is awaited first so a concurrency slot is never held
    /// while waiting for quota. Returns a guard that releases the concurrency
    /// slot when dropped.
    pub async fn acquire(&self) -> RateLimiterGuard {
        if let Some(limiter) = &self.window_limiter {
            limiter.until_ready().await;
        }

        let permit = match &self.concurrent_semaphore {
            Some(semaphore) => match semaphore.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    warn!(tier = self.inner.name(), error = %e, "Concurrency semaphore closed");
                    None
                }
            },
            None => None,
        };

        RateLimiterGuard { _permit: permit }
    }

    /// Try to acquire without waiting.
    ///
    /// Returns `None` if either limit would block.
    pub fn try_acquire(&self) -> Option<RateLimiterGuard> {
        if let Some(limiter) = &self.window_limiter {
            limiter.check().ok()?;
        }

        let permit = match &self.concurrent_semaphore {
            Some(semaphore) => Some(semaphore.clone().try_acquire_owned().ok()?),
            None => None,
        };

        Some(RateLimiterGuard { _permit: permit })
    }
}

/// RAII guard for rate limiter.
///
/// Releases the concurrency slot when dropped, even if the request fails.
pub struct RateLimiterGuard {
    _permit: Option<OwnedSemaphorePermit>,
}
