//! Per-source Rate Limiter
//!
//! Guarantees a minimum spacing between outbound requests to the same source,
//! whatever the retry or concurrency pressure. Each caller reserves the next
//! free slot under a short lock and then sleeps outside of it, so concurrent
//! callers queue up one `min_delay` apart instead of racing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Rate limiter keyed by source name
pub struct RateLimiter {
    min_delay: Duration,
    // Last reserved request slot per key
    slots: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    /// At most one request per source every 2 seconds:
    /// `RateLimiter::new(Duration::from_secs(2))`
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until a request to `key` is allowed, then claim the slot
    pub async fn acquire(&self, key: &str) {
        let slot = self.reserve(key);
        let now = Instant::now();
        if slot > now {
            debug!(
                source = %key,
                wait_ms = (slot - now).as_millis() as u64,
                "Rate limiting outbound request"
            );
            sleep_until(slot).await;
        }
    }

    fn reserve(&self, key: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = match slots.get(key) {
            Some(last) => (*last + self.min_delay).max(now),
            None => now,
        };
        slots.insert(key.to_string(), slot);
        slot
    }
}
