//! Adaptive poll interval.
//!
//! Idle rooms back off geometrically up to a ceiling; any poll that returns
//! new messages snaps the interval back to the floor.

use std::time::Duration;

use crate::ConfigError;

/// Tuning knobs for [`BackoffPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Interval used right after activity. Lower bound of every result.
    pub min_interval: Duration,
    /// Upper bound of every result.
    pub max_interval: Duration,
    /// Multiplier applied after each poll without new messages.
    pub rate: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
            rate: 1.1,
        }
    }
}

impl BackoffConfig {
    /// Check that the bounds are ordered and the rate never shrinks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_interval.is_zero() {
            return Err(ConfigError::invalid("min_interval", "must be greater than zero"));
        }
        if self.min_interval > self.max_interval {
            return Err(ConfigError::invalid(
                "max_interval",
                format!("{:?} is below min_interval {:?}", self.max_interval, self.min_interval),
            ));
        }
        if !self.rate.is_finite() || self.rate < 1.0 {
            return Err(ConfigError::invalid("rate", format!("{} must be >= 1.0", self.rate)));
        }
        Ok(())
    }
}

/// Pure next-interval computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    config: BackoffConfig,
}

impl BackoffPolicy {
    /// Build a policy from a validated config.
    pub fn new(config: BackoffConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Floor of the interval range.
    pub fn min_interval(&self) -> Duration {
        self.config.min_interval
    }

    /// Ceiling of the interval range.
    pub fn max_interval(&self) -> Duration {
        self.config.max_interval
    }

    /// Interval to wait before the next poll.
    ///
    /// Resets to `min_interval` when the last poll produced new messages,
    /// otherwise grows by `rate` and saturates at `max_interval`.
    pub fn next(&self, current: Duration, got_new_messages: bool) -> Duration {
        let BackoffConfig { min_interval, max_interval, rate } = self.config;
        if got_new_messages {
            return min_interval;
        }

        let current = current.clamp(min_interval, max_interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * rate)
            .map_or(max_interval, |grown| grown.clamp(current, max_interval))
    }
}
