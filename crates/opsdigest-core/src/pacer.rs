//! Fixed pacing between upstream page requests.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Keeps a fixed interval between consecutive upstream requests.
///
/// Two rules apply. [`settle`](Self::settle) holds the caller for the full
/// interval after every page response, however long the response took.
/// [`ready`](Self::ready) additionally keeps request starts an interval apart
/// across clones, which share one budget. A zero interval turns pacing off.
#[derive(Clone)]
pub struct RequestPacer {
    interval: Duration,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval)
            .map(|quota| quota.allow_burst(NonZeroU32::MIN))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { interval, limiter }
    }

    pub fn unpaced() -> Self {
        Self {
            interval: Duration::ZERO,
            limiter: None,
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the next request slot is available.
    pub async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Waits the full interval. Called once a page response has been handled.
    pub async fn settle(&self) {
        if self.is_paced() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("interval", &self.interval)
            .field("paced", &self.is_paced())
            .finish()
    }
}
