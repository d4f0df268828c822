use std::time::Duration;

use quire_core::config::RetryConfig;

use crate::contracts::ApiResult;

/// Fixed-delay retry for transient failures; anything else fails at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> ApiResult<T>) -> ApiResult<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(err) if err.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation = label,
                        attempt,
                        retries = self.retries,
                        error = %err,
                        "transient failure, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                outcome => return outcome,
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}
