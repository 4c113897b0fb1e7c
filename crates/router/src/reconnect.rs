//! The per-client reconnect timer (component H): on disconnect, kill all
//! outstanding transactions, then retry the full connect sequence after
//! a back-off, rearming on failure.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// Default back-off between reconnect attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);

/// Drives repeated reconnect attempts with a fixed back-off between
/// tries. Outstanding requests from before the disconnect are never
/// replayed; callers that observed `disconnected` decide for
/// themselves whether to retry their own request once reconnected.
pub struct ReconnectTimer {
    backoff: Duration,
}

impl Default for ReconnectTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectTimer {
    /// Creates a timer using [`DEFAULT_BACKOFF`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Creates a timer with a caller-chosen back-off (tests use this to
    /// avoid real sleeps).
    #[must_use]
    pub fn with_backoff(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// Waits one back-off period, then calls `attempt` repeatedly,
    /// waiting another back-off period between failures, until it
    /// succeeds.
    pub async fn run<F, Fut, T, E>(&self, mut attempt: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        loop {
            tokio::time::sleep(self.backoff).await;
            match attempt().await {
                Ok(value) => {
                    info!("reconnect succeeded");
                    return value;
                }
                Err(err) => {
                    warn!(error = %err, "reconnect attempt failed, rearming back-off");
                }
            }
        }
    }
}
