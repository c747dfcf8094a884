//! Client configuration.

use std::time::Duration;

/// Production service endpoint.
pub const DEFAULT_API_URL: &str = "https://api.k9crypt.xyz";

/// Connection settings for [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base URL, without a trailing path.
    pub base_url: String,
    /// Upper bound for a whole request, connect to last body byte.
    pub request_timeout: Duration,
    /// Upper bound for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}
