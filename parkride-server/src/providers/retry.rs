//! Bounded retry for rate-limited provider calls.
//!
//! Some providers answer "too many requests" instead of queueing. The
//! identical request is re-sent after a fixed interval until a
//! non-rate-limited answer arrives, up to `max_attempts` tries.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::ProviderError;

/// Default wait between rate-limited attempts.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default attempt bound (about half a minute of waiting).
const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Waits between attempts. Abstracted so tests can observe the waits.
pub trait Backoff: Send + Sync {
    fn wait(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// Backoff that sleeps on the tokio timer, blocking only the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackoff;

impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Retry policy for rate-limited responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub interval: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Runs `op` until it returns something other than `RateLimited`,
    /// sleeping on the tokio timer in between.
    pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.run_with(&TokioBackoff, what, op).await
    }

    /// Like [`run`](Self::run) with an explicit backoff.
    pub async fn run_with<B, T, F, Fut>(
        &self,
        backoff: &B,
        what: &str,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        B: Backoff,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match op().await {
                Err(ProviderError::RateLimited) if attempts >= max_attempts => {
                    warn!(what, attempts, "giving up after repeated rate limiting");
                    return Err(ProviderError::RetryExhausted { attempts });
                }
                Err(ProviderError::RateLimited) => {
                    debug!(what, attempt = attempts, "rate limited, retrying a bit later");
                    backoff.wait(self.interval).await;
                }
                other => return other,
            }
        }
    }
}
