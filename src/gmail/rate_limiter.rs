use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Sliding-window rate limiter shared by every call of one fetch batch.
///
/// At most `limit` acquisitions are admitted in any rolling `window`.
/// Excess callers wait until the oldest admission leaves the window.
/// Built on `tokio::time::Instant` so a paused test clock drives it.
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        let limit = limit.max(1);
        SlidingWindowRateLimiter {
            limit,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a slot in the current window
    pub async fn acquire(&self) {
        loop {
            let wake_at = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();

                while admitted
                    .front()
                    .is_some_and(|&at| now.duration_since(at) >= self.window)
                {
                    admitted.pop_front();
                }

                if admitted.len() < self.limit {
                    admitted.push_back(now);
                    return;
                }

                // limit >= 1, so a full queue has a front
                admitted[0] + self.window
            };

            debug!("Rate limit reached ({} per {:?}), waiting", self.limit, self.window);
            sleep_until(wake_at).await;
        }
    }
}
