//! Backoff and retry loop
//!
//! Wraps a single request-issuing call in an explicit attempt/wait/give-up
//! loop. Classification is delegated to `Error::is_retryable`; this module
//! only decides how long to sleep and when the budget is spent.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

/// Retry policy: exponential backoff with full jitter, bounded by a
/// wall-clock budget rather than an attempt count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total wall-clock budget across all attempts and sleeps
    pub max_elapsed: Duration,
    /// Backoff base; attempt n may sleep up to `base * 2^n`
    pub base: Duration,
    /// Upper bound on any single sleep
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(600),
            base: Duration::from_secs(1),
            cap: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails fatally, or the budget is exhausted.
    ///
    /// Fatal errors and the last error seen at budget exhaustion propagate
    /// unmodified, so callers see the provider's payload.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }

                    let wait = self.backoff(attempt);
                    if start.elapsed() + wait >= self.max_elapsed {
                        return Err(err);
                    }

                    warn!(
                        "Error receiving data from square. Sleeping {:.1} seconds before trying again",
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Full jitter: uniform over [0, min(cap, base * 2^attempt)]
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt.min(32) as i32);
        let ceiling = exp.min(self.cap.as_secs_f64());
        let jittered = rand::thread_rng().gen_range(0.0..=ceiling);
        Duration::from_secs_f64(jittered)
    }
}
