//! Fixed-delay retry with an explicit outcome.
//!
//! Bus bring-up on real hardware is a wait-for-the-chip affair, so the
//! default policies retry forever. Callers that prefer to fail fast hand in
//! a bounded policy and get the last error back instead of spinning.

use core::fmt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Fixed wait between attempts.
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub const fn unbounded(delay_ms: u64) -> Self {
        Self {
            max_attempts: None,
            delay_ms,
        }
    }

    pub const fn bounded(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay_ms,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(100)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns the last error when a bounded policy runs out of attempts. The
/// delay is applied between attempts, never after the last one.
pub fn run_with_retry<T, E, F>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if let Some(max) = policy.max_attempts {
                    if attempt >= max {
                        warn!("{label} failed after {attempt} attempt(s): {err}");
                        return Err(err);
                    }
                }
                warn!("{label} failed (attempt {attempt}): {err}, retrying");
                if policy.delay_ms > 0 {
                    std::thread::sleep(policy.delay());
                }
            }
        }
    }
}
