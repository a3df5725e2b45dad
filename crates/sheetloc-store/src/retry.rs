use std::time::Duration;

use crate::StoreError;

/// Exponential backoff for quota errors. Anything else fails immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    sleep: fn(Duration),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            sleep: std::thread::sleep,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_sleeper(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_quota() && attempt < self.max_attempts => {
                    let wait = self.delay(attempt);
                    tracing::warn!(
                        event = "store_quota_retry",
                        op = what,
                        attempt = attempt,
                        max = self.max_attempts,
                        delay_ms = wait.as_millis() as u64,
                    );
                    (self.sleep)(wait);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_quota() {
                        tracing::warn!(event = "store_quota_exhausted", op = what, attempts = attempt);
                    }
                    return Err(e);
                }
            }
        }
    }
}
