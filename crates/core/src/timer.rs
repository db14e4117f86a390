//! Cancellation tokens for restartable timers.
//!
//! Every restartable timer (the resend countdown, the arcade frame loop) owns a
//! [`TimerSlot`]. Starting or restarting the timer calls [`TimerSlot::renew`],
//! which hands out a fresh [`TimerToken`] and invalidates every token issued
//! before it. The scheduled callback checks [`TimerToken::is_live`] before each
//! tick and returns once it is stale, so at most one run of a timer ever makes
//! progress no matter how many restarts raced with it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owner side of a restartable timer.
#[derive(Debug, Clone, Default)]
pub struct TimerSlot {
    generation: Arc<AtomicU64>,
}

impl TimerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all outstanding tokens and return a new live one.
    #[must_use = "the returned token is the only live one"]
    pub fn renew(&self) -> TimerToken {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        TimerToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Invalidate all outstanding tokens without issuing a new one.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Handle held by one scheduled run of a timer.
#[derive(Debug, Clone)]
pub struct TimerToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl TimerToken {
    /// Whether this run is still the current one.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }
}
