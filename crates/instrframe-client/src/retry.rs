use std::time::Duration;

use tracing::debug;

use crate::error::{ClientError, Result};

/// Bounds for [`retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero behaves like one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Which errors are worth another attempt.
    pub retry_on: fn(&ClientError) -> bool,
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(100),
            retry_on: ClientError::is_transient,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The last error is returned.
///
/// `op` receives the 1-based attempt number.
pub fn retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let mut remaining = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        remaining -= 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 && (policy.retry_on)(&err) => {
                debug!(attempt, remaining, error = %err, "retrying");
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
