//! Per-message retry policy.

use std::time::Duration;

/// Growth of the delay between failed handler attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// The same delay before every retry.
    #[default]
    Fixed,
    /// Delay multiplied by `multiplier` after each failed attempt, capped at `max_delay`.
    Exponential { multiplier: u32, max_delay: Duration },
}

/// How often a message is retried and how long the worker waits in between.
///
/// A message gets `1 + max_attempts` handler invocations in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// No retries: one attempt, then dead-letter or drop.
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Opt into exponential growth of the retry delay.
    pub fn with_exponential_backoff(mut self, multiplier: u32, max_delay: Duration) -> Self {
        self.backoff = Backoff::Exponential {
            multiplier,
            max_delay,
        };
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1);
                let factor = multiplier.max(1).saturating_pow(exponent);
                self.delay.saturating_mul(factor).min(max_delay)
            }
        }
    }
}
