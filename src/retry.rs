//! Fixed-count retry with exponential backoff for transient transport errors.

use crate::error::Result;
use crate::types::config::RetryPolicy;
use std::time::Duration;
use tracing::warn;

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(policy.backoff_base_ms.saturating_mul(factor))
}

/// Runs `op` up to `max_retries + 1` times, sleeping between attempts.
///
/// Only errors for which [`GraderError::is_transient`] holds are retried.
///
/// [`GraderError::is_transient`]: crate::error::GraderError::is_transient
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = backoff_delay(policy, attempt);
                warn!(
                    %label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
