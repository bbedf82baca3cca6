//! HTTP transport and retry policy
//!
//! Provides:
//! - `SquareClient` - bearer-authenticated client for the Square REST API
//! - `RetryPolicy` - exponential backoff with full jitter and a wall-clock budget
//! - `timed` - named request timers around each page call

mod client;
mod retry;

pub use client::SquareClient;
pub use retry::RetryPolicy;

use crate::error::Result;
use std::future::Future;
use std::time::Instant;
use tracing::info;

/// Run a request future under a named timer, logging the elapsed time.
///
/// Labels name the logical request group ("GET locations", "GET access
/// token"), not individual attempts.
pub async fn timed<T, F>(label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let out = fut.await;
    info!(
        target: "square_tap::metrics",
        elapsed_ms = start.elapsed().as_millis() as u64,
        "{label}"
    );
    out
}
