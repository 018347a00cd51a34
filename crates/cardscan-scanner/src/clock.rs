//! Millisecond clock used for cooldown bookkeeping.
//!
//! Timestamps are `u32` milliseconds and wrap after ~49.7 days, like the
//! microcontroller uptime counter they model. Differences must always be
//! taken with [`elapsed_ms`], which stays correct across the wrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::time::Instant;

/// Source of wrapping millisecond timestamps.
pub trait MonotonicClock: Send + Sync {
    /// Milliseconds since an arbitrary epoch, modulo 2^32.
    fn now_ms(&self) -> u32;
}

/// Milliseconds from `last` to `now`, correct across one wrap of the counter.
///
/// # Examples
///
/// ```
/// use cardscan_scanner::clock::elapsed_ms;
///
/// assert_eq!(elapsed_ms(1_500, 1_000), 500);
/// assert_eq!(elapsed_ms(99, u32::MAX - 100), 200);
/// ```
#[inline]
#[must_use]
pub fn elapsed_ms(now: u32, last: u32) -> u32 {
    now.wrapping_sub(last)
}

/// Clock backed by the tokio timer, so paused-time tests control it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: Instant,
}

impl TokioClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for TokioClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.epoch.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    /// Clock reading `start`.
    pub fn starting_at(start: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start)),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: u32) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `ms`, wrapping.
    pub fn advance(&self, ms: u32) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.wrapping_add(ms)));
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
