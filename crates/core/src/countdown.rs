//! Whole-second countdown.
//!
//! [`Countdown`] is the state of the resend-code timer: a number of seconds
//! left that drops by one on every [`Countdown::tick`] until it reaches zero.
//! The storefront drives it from a tokio interval; this type only knows about
//! ticks, never about clocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds remaining on a countdown, plus the duration it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    initial: u32,
    remaining: u32,
}

impl Countdown {
    /// Start a countdown at `initial_secs`. Zero is complete immediately.
    #[must_use]
    pub const fn new(initial_secs: u32) -> Self {
        Self {
            initial: initial_secs,
            remaining: initial_secs,
        }
    }

    /// Rebuild a countdown of `initial_secs` that ends at `deadline`.
    ///
    /// Used when the live timer was lost (server restart, cache eviction) but
    /// the challenge still records when resending becomes possible.
    #[must_use]
    pub fn resume(initial_secs: u32, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = (deadline - now).num_seconds().clamp(0, i64::from(initial_secs));
        Self {
            initial: initial_secs,
            remaining: u32::try_from(left).unwrap_or(0),
        }
    }

    /// Advance by one second. Returns the new remaining value.
    ///
    /// Ticking a complete countdown does nothing.
    pub const fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Begin a fresh countdown at `secs`.
    ///
    /// The duration passed to [`Countdown::new`] is kept for [`Countdown::reset`].
    pub const fn restart(&mut self, secs: u32) {
        self.remaining = secs;
    }

    /// Return to the duration the countdown was created with.
    pub const fn reset(&mut self) {
        self.remaining = self.initial;
    }

    #[must_use]
    pub const fn time_left(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn initial(&self) -> u32 {
        self.initial
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}
