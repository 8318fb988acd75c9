//! Retry backoff
//!
//! Exponential from `min` to `max`, plus up to `jitter * base` of random
//! extra delay so destinations sharing one source leader do not retry in
//! lockstep. Delays never decrease until `reset` and never exceed `max`.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    jitter: f64,
    current: Duration,
    last: Duration,
    attempts: u32,
}

impl Backoff {
    /// `jitter` is clamped to `[0, 1]`; `max` is raised to `min` if lower.
    pub fn new(min: Duration, max: Duration, jitter: f64) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            jitter: jitter.clamp(0.0, 1.0),
            current: min,
            last: Duration::ZERO,
            attempts: 0,
        }
    }

    /// Delay before the next retry.
    pub fn next_delay(&mut self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }

    pub fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let base = self.current;
        let spread = base.mul_f64(self.jitter);
        let extra = if spread.is_zero() {
            Duration::ZERO
        } else {
            spread.mul_f64(rng.gen_range(0.0..=1.0))
        };

        let delay = (base + extra).min(self.max).max(self.last);
        self.last = delay;
        self.current = base.checked_mul(2).unwrap_or(self.max).min(self.max);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Back to `min` after a successful round.
    pub fn reset(&mut self) {
        self.current = self.min;
        self.last = Duration::ZERO;
        self.attempts = 0;
    }

    /// Failures since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}
