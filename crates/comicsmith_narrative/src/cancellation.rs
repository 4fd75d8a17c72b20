//! Run-wide cancellation signal.

use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation signal shared by everything taking part in a run.
///
/// Clones observe the same signal. Cancelling is idempotent.
///
/// # Examples
///
/// ```
/// use comicsmith_narrative::RunCancellation;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cancel = RunCancellation::new();
/// let observer = cancel.clone();
///
/// cancel.cancel();
/// observer.cancelled().await;
/// assert!(observer.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RunCancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for RunCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCancellation {
    /// A signal that has not fired.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fire the signal.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender lives as long as self, so the channel cannot close here
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
