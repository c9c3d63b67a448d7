//! Brute-force throttling for PIN unlocks and sign-in.
//!
//! Two policies:
//! - [`PinAttempts`]: a persisted consecutive-failure counter with a
//!   stepped cooldown after 3, 5, 8 and 10 failures.
//! - [`RateLimiter`]: a fixed window per key (5 sign-in attempts per
//!   5 minutes by default), kept in memory only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cooldown thresholds, checked in order (highest threshold first).
/// Each entry: `(min_failures, delay_ms)`.
const BACKOFF_SCHEDULE: &[(u32, u64)] = &[
    (10, 300_000), // 10+ failures → 5 minutes
    (8, 30_000),   //  8+ failures → 30 seconds
    (5, 5_000),    //  5+ failures → 5 seconds
    (3, 1_000),    //  3+ failures → 1 second
];

/// Default sign-in attempts allowed per window.
pub const SIGN_IN_MAX_ATTEMPTS: u32 = 5;

/// Default sign-in window length.
pub const SIGN_IN_WINDOW_MS: u64 = 300_000;

/// Calculate the required delay (ms) for a given failure count.
#[must_use]
pub fn required_delay_ms(failures: u32) -> u64 {
    for &(threshold, delay) in BACKOFF_SCHEDULE {
        if failures >= threshold {
            return delay;
        }
    }
    0
}

// ---------------------------------------------------------------------------
// PinAttempts
// ---------------------------------------------------------------------------

/// Consecutive PIN failures, persisted under `pin_attempts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinAttempts {
    /// Failures since the last successful unlock.
    pub failures: u32,
    /// Epoch ms of the most recent failure.
    #[serde(default)]
    pub last_failure_at: Option<u64>,
}

impl PinAttempts {
    /// Remaining cooldown in ms, or `None` if an attempt may proceed.
    #[must_use]
    pub fn cooldown_remaining(&self, now_ms: u64) -> Option<u64> {
        let delay_ms = required_delay_ms(self.failures);
        if delay_ms == 0 {
            return None;
        }

        let last = self.last_failure_at?;
        let elapsed_ms = now_ms.saturating_sub(last);

        if elapsed_ms < delay_ms {
            Some(delay_ms.saturating_sub(elapsed_ms))
        } else {
            None
        }
    }

    /// Record one failure at `now_ms`.
    pub fn record_failure(&mut self, now_ms: u64) {
        self.failures = self.failures.saturating_add(1);
        self.last_failure_at = Some(now_ms);
    }

    /// Forget all failures.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: u64,
    count: u32,
}

/// Fixed-window attempt limiter keyed by string.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: u32,
    window_ms: u64,
    windows: HashMap<String, Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(SIGN_IN_MAX_ATTEMPTS, SIGN_IN_WINDOW_MS)
    }
}

impl RateLimiter {
    /// Allow `max_attempts` per `window_ms`.
    #[must_use]
    pub fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self {
            max_attempts,
            window_ms,
            windows: HashMap::new(),
        }
    }

    /// Count an attempt for `key`.
    ///
    /// # Errors
    ///
    /// Returns the remaining window time in ms when the key has already
    /// used all of its attempts. A refused attempt is not counted.
    pub fn check(&mut self, key: &str, now_ms: u64) -> Result<(), u64> {
        let window_ms = self.window_ms;
        let entry = self.windows.entry(key.to_owned()).or_insert(Window {
            started_at: now_ms,
            count: 0,
        });

        if now_ms.saturating_sub(entry.started_at) >= window_ms {
            *entry = Window {
                started_at: now_ms,
                count: 0,
            };
        }

        if entry.count >= self.max_attempts {
            let elapsed = now_ms.saturating_sub(entry.started_at);
            return Err(window_ms.saturating_sub(elapsed));
        }

        entry.count = entry.count.saturating_add(1);
        Ok(())
    }

    /// Clear the window for `key`.
    pub fn reset(&mut self, key: &str) {
        self.windows.remove(key);
    }

    /// Clear every window.
    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
