//! Tier trait for representing provider quota constraints.

use std::time::Duration;

/// Rate limiting constraints for one provider.
///
/// All `Option` methods return `None` for unlimited.
///
/// # Example
///
/// ```
/// use comicsmith_rate_limit::Tier;
/// use std::time::Duration;
///
/// struct Hobbyist;
///
/// impl Tier for Hobbyist {
///     fn requests_per_window(&self) -> Option<u32> { Some(5) }
///     fn window(&self) -> Duration { Duration::from_secs(60) }
///     fn max_concurrent(&self) -> Option<u32> { Some(1) }
///     fn name(&self) -> &str { "hobbyist" }
/// }
///
/// assert_eq!(Hobbyist.requests_per_window(), Some(5));
/// ```
pub trait Tier: Send + Sync {
    /// Requests admitted per window.
    fn requests_per_window(&self) -> Option<u32>;

    /// Length of the rate window.
    fn window(&self) -> Duration;

    /// Maximum concurrent in-flight requests against the provider.
    fn max_concurrent(&self) -> Option<u32>;

    /// Provider or tier name.
    fn name(&self) -> &str;
}

impl<T: Tier + ?Sized> Tier for Box<T> {
    fn requests_per_window(&self) -> Option<u32> {
        (**self).requests_per_window()
    }

    fn window(&self) -> Duration {
        (**self).window()
    }

    fn max_concurrent(&self) -> Option<u32> {
        (**self).max_concurrent()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
