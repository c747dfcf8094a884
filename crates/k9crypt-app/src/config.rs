//! Session tuning.

use std::time::Duration;

use k9crypt_core::{BackoffConfig, ConfigError, dedup::DEFAULT_CAPACITY};

/// Knobs for one chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Poll interval bounds and growth.
    pub backoff: BackoffConfig,
    /// Number of displayed message ids remembered for deduplication.
    pub cache_capacity: usize,
    /// Decrypt requests issued concurrently per batch.
    pub decrypt_batch_size: usize,
    /// Window in which repeated submissions collapse into the last one.
    pub debounce: Duration,
    /// Upper bound for any fetch, decrypt or send.
    pub request_timeout: Duration,
    /// Upper bound for the leave call made while shutting down.
    pub leave_timeout: Duration,
    /// Whether Esc, Ctrl-C or a termination signal also leave the room.
    pub leave_on_interrupt: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            cache_capacity: DEFAULT_CAPACITY,
            decrypt_batch_size: 16,
            debounce: Duration::from_millis(200),
            request_timeout: Duration::from_secs(10),
            leave_timeout: Duration::from_secs(2),
            leave_on_interrupt: true,
        }
    }
}

impl SessionConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backoff.validate()?;
        if self.cache_capacity == 0 {
            return Err(ConfigError::invalid("cache_capacity", "must be at least 1"));
        }
        if self.decrypt_batch_size == 0 {
            return Err(ConfigError::invalid("decrypt_batch_size", "must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be greater than zero"));
        }
        if self.leave_timeout.is_zero() {
            return Err(ConfigError::invalid("leave_timeout", "must be greater than zero"));
        }
        Ok(())
    }
}
