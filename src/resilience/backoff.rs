//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter is 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Consecutive dial failures against a reconnect policy.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectConfig) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Record a failure. Returns the delay before retrying, or `None`
    /// once `max_attempts` failures have accumulated.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        if self.policy.max_attempts != 0 && self.attempt >= self.policy.max_attempts {
            return None;
        }
        Some(calculate_backoff(
            self.attempt,
            self.policy.base_delay_ms,
            self.policy.max_delay_ms,
        ))
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
