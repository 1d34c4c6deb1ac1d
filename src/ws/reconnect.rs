//! Reconnection delay policy
//!
//! The default is a fixed delay with no attempt cap. Exponential backoff with
//! jitter is available as an opt-in mode.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// How the delay evolves across consecutive failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    /// Same delay every time
    #[default]
    Fixed,
    /// Doubling delay, capped, with jitter
    Exponential,
}

/// Reconnection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    pub mode: BackoffMode,
    /// Delay for fixed mode, starting delay for exponential mode
    pub initial_delay: Duration,
    /// Cap for exponential mode
    pub max_delay: Duration,
    /// Jitter as a fraction of the delay (exponential mode only)
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl ReconnectConfig {
    /// Fixed delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            mode: BackoffMode::Fixed,
            initial_delay: delay,
            max_delay: delay,
            jitter_factor: 0.0,
        }
    }

    /// Exponential backoff from `initial_delay` up to `max_delay`
    pub fn exponential(initial_delay: Duration, max_delay: Duration, jitter_factor: f64) -> Self {
        Self {
            mode: BackoffMode::Exponential,
            initial_delay,
            max_delay,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
        }
    }
}

/// Tracks attempts and hands out the next delay
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempt_count: 0,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count = self.attempt_count.saturating_add(1);

        match self.config.mode {
            BackoffMode::Fixed => self.config.initial_delay,
            BackoffMode::Exponential => {
                let delay = self.apply_jitter(self.current_delay);
                self.current_delay = self
                    .current_delay
                    .saturating_mul(2)
                    .min(self.config.max_delay);
                delay
            }
        }
    }

    /// Reset after a connection opened successfully
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    /// Attempts since the last successful connection
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }

        let spread = delay.as_secs_f64() * self.config.jitter_factor;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::try_from_secs_f64((delay.as_secs_f64() + offset).max(0.0)).unwrap_or(delay)
    }
}
