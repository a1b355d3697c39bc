//! Minimum-interval rate limiter for outbound API calls

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Enforces a fixed minimum delay between consecutive calls
///
/// The first call passes immediately. Every later call sleeps for whatever
/// remains of the interval since the previous call started.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Sleep for whatever remains of the interval, then record this call
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        let remaining = (*last)
            .map(|previous| self.min_interval.saturating_sub(previous.elapsed()))
            .unwrap_or_default();
        if !remaining.is_zero() {
            debug!(?remaining, "Holding API call for rate limit");
            tokio::time::sleep(remaining).await;
        }

        *last = Some(Instant::now());
    }
}
