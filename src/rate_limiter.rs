// Minimum-interval rate limiter shared by the HTTP oracles.
//
// OpenAI embedding batches are spaced ~100ms apart and Google Natural Language
// calls ~50ms apart. Every caller awaits `acquire()` before a request; the
// limiter remembers when the last request went out and sleeps off the rest of
// the interval. Clones share the same clock, so concurrent drag trials are
// throttled together.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second.
    pub fn per_second(requests_per_second: f64) -> Self {
        Self::with_interval(Duration::from_secs_f64(1.0 / requests_per_second))
    }

    /// Require at least `interval` between consecutive requests.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request is allowed.
    ///
    /// The lock is held across the sleep so queued callers go out one
    /// interval apart instead of all waking together.
    pub async fn acquire(&self) {
        let mut last = self.inner.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
