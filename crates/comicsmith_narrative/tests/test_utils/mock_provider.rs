//! Scripted image provider for coordinator and pipeline tests.

use async_trait::async_trait;
use comicsmith_core::{GenerationConstraints, ImageRef};
use comicsmith_error::{ProviderError, ProviderErrorKind};
use comicsmith_interface::ImageProvider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return an image
    Success,
    /// Always return the specified error
    Error(ProviderErrorKind),
    /// Fail N times with the error, then succeed
    FailThenSucceed {
        fail_count: usize,
        error: ProviderErrorKind,
    },
}

/// Mock image provider.
///
/// Counts calls, tracks how many calls are in flight at once and can hold
/// every call at a gate until the test releases it.
#[derive(Clone)]
pub struct MockImageProvider {
    name: String,
    behavior: MockBehavior,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockImageProvider {
    /// Create a mock with custom behavior.
    pub fn new_with_behavior(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Create a mock that always succeeds.
    pub fn new_success(name: impl Into<String>) -> Self {
        Self::new_with_behavior(name, MockBehavior::Success)
    }

    /// Create a mock that always fails with the given error.
    pub fn new_error(name: impl Into<String>, error: ProviderErrorKind) -> Self {
        Self::new_with_behavior(name, MockBehavior::Error(error))
    }

    /// Create a mock that fails N times, then succeeds.
    pub fn new_fail_then_succeed(
        name: impl Into<String>,
        fail_count: usize,
        error: ProviderErrorKind,
    ) -> Self {
        Self::new_with_behavior(name, MockBehavior::FailThenSucceed { fail_count, error })
    }

    /// Hold every call until [`MockImageProvider::release`] lets it through.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of times generate() was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls observed.
    #[allow(dead_code)]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    #[allow(dead_code)]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Wait until at least `n` calls have started.
    #[allow(dead_code)]
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    fn respond(&self, call: usize) -> Result<ImageRef, ProviderError> {
        let image = || ImageRef::Url(format!("https://images.test/{}/{}.png", self.name, call));
        match &self.behavior {
            MockBehavior::Success => Ok(image()),
            MockBehavior::Error(kind) => Err(ProviderError::new(kind.clone())),
            MockBehavior::FailThenSucceed { fail_count, error } => {
                if call < *fail_count {
                    Err(ProviderError::new(error.clone()))
                } else {
                    Ok(image())
                }
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(
        &self,
        prompt: &str,
        _constraints: &GenerationConstraints,
    ) -> Result<ImageRef, ProviderError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.respond(call)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
