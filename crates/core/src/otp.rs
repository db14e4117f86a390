//! One-time codes for email verification.
//!
//! Codes are generated and checked on the server. The browser only ever sees
//! the [`OtpChallenge::id`], which lets a stale verify form be told apart from
//! the current one.

use core::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of digits in a code.
pub const CODE_LENGTH: usize = 6;

const CODE_MIN: u32 = 100_000;
const CODE_MAX_EXCLUSIVE: u32 = 1_000_000;

/// A six-digit numeric code.
///
/// Values are drawn uniformly from `100000..=999999`, so the leading digit is
/// never zero. `Debug` never prints the digits.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Draw a fresh code from `rng`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value = rng.random_range(CODE_MIN..CODE_MAX_EXCLUSIVE);
        Self(value.to_string())
    }

    /// Exact comparison against user input.
    ///
    /// Input is not trimmed or normalised: `" 123456"` and `"0123456"` never
    /// match `"123456"`.
    #[must_use]
    pub fn matches(&self, input: &str) -> bool {
        self.0 == input
    }

    /// The digits, for handing to the email dispatcher.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

/// The single active verification challenge of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub id: Uuid,
    pub code: OtpCode,
    pub sent_at: DateTime<Utc>,
    pub resend_deadline: DateTime<Utc>,
}

impl OtpChallenge {
    /// Issue a new challenge at `now` that may be resent after `resend_after`.
    pub fn issue<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, resend_after: Duration) -> Self {
        Self {
            id: random_id(rng),
            code: OtpCode::generate(rng),
            sent_at: now,
            resend_deadline: now + resend_after,
        }
    }
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
