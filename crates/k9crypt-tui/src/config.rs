//! Layered configuration.
//!
//! Compiled defaults, then the flat records in `settings.json`, then command
//! line flags. Unknown settings keys are left alone; they may belong to other
//! tools sharing the data directory.

use std::{collections::BTreeMap, time::Duration};

use k9crypt_app::SessionConfig;
use k9crypt_client::ClientConfig;
use k9crypt_core::ConfigError;
use serde_json::Value;

const API_URL: &str = "apiUrl";
const POLL_MIN_MS: &str = "pollMinMs";
const POLL_MAX_MS: &str = "pollMaxMs";
const BACKOFF_RATE: &str = "backoffRate";
const CACHE_CAPACITY: &str = "cacheCapacity";
const DECRYPT_BATCH_SIZE: &str = "decryptBatchSize";
const DEBOUNCE_MS: &str = "debounceMs";
const REQUEST_TIMEOUT_MS: &str = "requestTimeoutMs";
const LEAVE_TIMEOUT_MS: &str = "leaveTimeoutMs";
const LEAVE_ON_INTERRUPT: &str = "leaveOnInterrupt";

/// Everything the binary needs to talk to the service and run a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    /// HTTP client settings.
    pub client: ClientConfig,
    /// Chat session tuning.
    pub session: SessionConfig,
}

impl Settings {
    /// Layer stored `settings` and the `--api-url` flag over the defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if a known key has the wrong type or the result fails
    /// validation.
    pub fn resolve(
        settings: &BTreeMap<String, Value>,
        api_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut resolved = Self::default();
        let session = &mut resolved.session;

        if let Some(url) = string(settings, API_URL)? {
            resolved.client.base_url = url;
        }
        if let Some(ms) = millis(settings, POLL_MIN_MS)? {
            session.backoff.min_interval = ms;
        }
        if let Some(ms) = millis(settings, POLL_MAX_MS)? {
            session.backoff.max_interval = ms;
        }
        if let Some(rate) = float(settings, BACKOFF_RATE)? {
            session.backoff.rate = rate;
        }
        if let Some(capacity) = count(settings, CACHE_CAPACITY)? {
            session.cache_capacity = capacity;
        }
        if let Some(size) = count(settings, DECRYPT_BATCH_SIZE)? {
            session.decrypt_batch_size = size;
        }
        if let Some(ms) = millis(settings, DEBOUNCE_MS)? {
            session.debounce = ms;
        }
        if let Some(ms) = millis(settings, REQUEST_TIMEOUT_MS)? {
            session.request_timeout = ms;
            resolved.client.request_timeout = ms;
        }
        if let Some(ms) = millis(settings, LEAVE_TIMEOUT_MS)? {
            session.leave_timeout = ms;
        }
        if let Some(flag) = boolean(settings, LEAVE_ON_INTERRUPT)? {
            session.leave_on_interrupt = flag;
        }

        if let Some(url) = api_url {
            resolved.client.base_url = url.to_owned();
        }

        resolved.session.validate()?;
        if resolved.client.base_url.trim().is_empty() {
            return Err(ConfigError::invalid(API_URL, "must not be empty"));
        }
        Ok(resolved)
    }
}

fn string(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<String>, ConfigError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::invalid(key, format!("expected a string, got {other}"))),
    }
}

fn unsigned(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, format!("expected a whole number, got {value}"))),
    }
}

fn millis(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(unsigned(settings, key)?.map(Duration::from_millis))
}

fn count(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<usize>, ConfigError> {
    unsigned(settings, key)?
        .map(|n| usize::try_from(n).map_err(|_| ConfigError::invalid(key, "too large")))
        .transpose()
}

fn float(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<f64>, ConfigError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, format!("expected a number, got {value}"))),
    }
}

fn boolean(settings: &BTreeMap<String, Value>, key: &'static str) -> Result<Option<bool>, ConfigError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(other) => Err(ConfigError::invalid(key, format!("expected true or false, got {other}"))),
    }
}
