//! Pacing between bridge attempts.

use std::time::Duration;

/// Decides how long to wait after a failed bridge attempt.
///
/// `failed_attempts` counts from 1. Strategies are `&mut self` so stateful
/// ones (jitter, budgets) fit without interior mutability.
pub trait RetryStrategy: Send {
    fn delay(&mut self, failed_attempts: u32) -> Duration;
}

/// The same pause after every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl RetryStrategy for FixedDelay {
    fn delay(&mut self, _failed_attempts: u32) -> Duration {
        self.0
    }
}

/// Geometric growth from `initial`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub factor: f64,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            factor: 2.0,
            max,
        }
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn delay(&mut self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl<F> RetryStrategy for F
where
    F: FnMut(u32) -> Duration + Send,
{
    fn delay(&mut self, failed_attempts: u32) -> Duration {
        self(failed_attempts)
    }
}
