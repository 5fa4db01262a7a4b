//! Fixed-window rate limiter shared by every virtual client
//!
//! Each window admits at most `limit` grants. A caller arriving at a full window waits
//! for the next one. Waiters queue on a tokio `Mutex`, which hands the lock out in FIFO
//! order, and the waiter at the head keeps the lock while it sleeps, so grants in a
//! refilled window go out in arrival order.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

#[derive(Debug)]
struct Window {
    started: Instant,
    granted: u32,
}

/// Global requests-per-window ceiling
#[derive(Debug)]
pub struct RateLimiter {
    limit: NonZeroU32,
    period: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: NonZeroU32, period: Duration) -> Self {
        Self {
            limit,
            period,
            window: Mutex::new(Window {
                started: Instant::now(),
                granted: 0,
            }),
        }
    }

    /// Shared limiter for `rps` requests per second, or `None` when `rps` is 0 (unlimited)
    pub fn per_second(rps: u32) -> Option<Arc<Self>> {
        NonZeroU32::new(rps).map(|limit| Arc::new(Self::new(limit, Duration::from_secs(1))))
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until the current window has room, then take one slot.
    ///
    /// Cancel-safe: dropping the future before it resolves takes no slot.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;

        let now = Instant::now();
        if now >= window.started + self.period {
            window.started = now;
            window.granted = 0;
        }

        if window.granted >= self.limit.get() {
            let next = window.started + self.period;
            sleep_until(next).await;
            window.started = next;
            window.granted = 0;
        }

        window.granted += 1;
    }
}
