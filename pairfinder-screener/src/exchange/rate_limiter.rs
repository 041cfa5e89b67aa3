//! Token bucket rate limiter for exchange request throttling.
//!
//! Public market-data endpoints are throttled per IP. Each adapter owns a
//! bucket so a screen never trips the exchange's own limiter.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Lower bound on a single wait so waiters do not spin.
const MIN_WAIT: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket rate limiter.
///
/// Holds up to one second's worth of requests and refills continuously at
/// `requests_per_minute / 60` tokens per second.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
    name: String,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `name` - Name for logging purposes
    /// * `requests_per_minute` - Maximum sustained requests per minute
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let capacity = ((rpm as f64 / 60.0).ceil() as u32).max(1);

        Self {
            capacity,
            refill_per_sec: rpm as f64 / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            name: name.into(),
        }
    }

    /// Acquire a token, waiting until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = match self.take_or_wait() {
                None => return,
                Some(wait) => wait.max(MIN_WAIT),
            };

            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for token"
            );

            tokio::time::sleep(wait).await;
        }
    }

    /// Take a token if one is available, otherwise return the time until
    /// the next token.
    fn take_or_wait(&self) -> Option<Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut bucket);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return None;
        }

        let missing = 1.0 - bucket.tokens;
        Some(Duration::from_secs_f64(missing / self.refill_per_sec))
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity as f64);
            bucket.last_refill = now;
        }
    }
}

/// Shared rate limiter that can be cloned.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared rate limiter.
pub fn shared_limiter(name: impl Into<String>, requests_per_minute: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::new(name, requests_per_minute))
}

// ============================================================================
// Tests
// ============================================================================
