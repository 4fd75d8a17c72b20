//! Provider rate limiting and pipeline configuration.
//!
//! Every image provider has an external quota (requests per time window,
//! optionally a concurrency cap) that is independent of the coordinator's
//! local worker pool. [`RateLimiter`] enforces that quota for all workers
//! sharing a provider.
//!
//! [`ComicsmithConfig`] carries the whole configuration surface: planner
//! thresholds, generation policy, per-provider limits, page layout and
//! prompt style. Provider sections implement [`Tier`] so they can drive a
//! limiter directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod limiter;
mod tier;

pub use config::{
    ComicsmithConfig, GenerationConfig, LayoutConfig, PlannerConfig, ProviderConfig, StyleConfig,
};
pub use limiter::{RateLimiter, RateLimiterGuard};
pub use tier::Tier;
