//! Request pacing for the reference site
//!
//! A token bucket per host keeps article fetches and search calls under the
//! configured requests-per-second. Requests are paced, never retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Token bucket refilled continuously at `rate` tokens per second.
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// `requests_per_second == 0` yields a bucket that never makes callers wait.
    pub fn new(requests_per_second: u32) -> Self {
        let capacity = if requests_per_second == 0 {
            f64::INFINITY
        } else {
            requests_per_second as f64
        };

        Self {
            tokens: capacity,
            capacity,
            rate: requests_per_second as f64,
            last_refill: Instant::now(),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity.is_infinite()
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take a token if one is available, otherwise report how long to wait.
    pub fn try_take(&mut self) -> Option<Duration> {
        if self.is_unlimited() {
            return None;
        }

        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64((1.0 - self.tokens) / self.rate))
        }
    }
}

/// Per-host pacing shared by every clone of the owning client.
#[derive(Debug, Clone)]
pub struct HostRateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    requests_per_second: u32,
}

impl HostRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            requests_per_second,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_second > 0
    }

    /// Wait until a request to `host` is allowed.
    pub async fn acquire(&self, host: &str) {
        if !self.is_enabled() {
            return;
        }

        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                buckets
                    .entry(host.to_string())
                    .or_insert_with(|| TokenBucket::new(self.requests_per_second))
                    .try_take()
            };

            match wait {
                None => return,
                Some(duration) => {
                    debug!("Pacing request to {} for {:?}", host, duration);
                    sleep(duration).await;
                }
            }
        }
    }
}
