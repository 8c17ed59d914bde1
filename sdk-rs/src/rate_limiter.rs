use std::time::Duration;

use log::debug;
use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

use crate::constants::DEFAULT_THROTTLE_INTERVAL;

/// Spaces out operations to at most one per `interval`
///
/// Callers queue on the internal lock in arrival order, so concurrent
/// `throttle()` calls are serialized rather than racing on the timestamp.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    /// when the previous `throttle()` returned
    last: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous call returned
    pub async fn throttle(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                debug!(target: "rate_limiter", "throttling for {:?}", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
