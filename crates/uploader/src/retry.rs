//! Per-chunk retry policy.
//!
//! The observed upload widgets surface every transport error straight to
//! the user; the bounded timeout and backoff here are a deliberate
//! addition so one flaky request does not fail a 200 MB video upload.

use std::time::Duration;

/// Default bound on a single chunk request.
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// Exponential backoff policy for chunk sends.
///
/// Attempt `n` (zero-based) waits `base_delay * 2^n` before the next try,
/// capped at `max_delay`. After `max_attempts` failed attempts the session
/// moves to the error state; manual retry remains available.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries automatically.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt following failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
