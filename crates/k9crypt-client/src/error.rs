//! Client error types.

use thiserror::Error;

/// Errors returned by any call to the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("server error: {status} - {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// `error` field of the body when present, otherwise the body text.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The configured base URL cannot be used.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Returns true if this error may succeed on retry.
    ///
    /// Transport failures, timeouts and 5xx responses are transient. Client
    /// errors (4xx), malformed bodies and bad configuration are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    /// Whether the failure happened below the HTTP status level.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout | Self::Decode(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_transient() {
        assert!(ClientError::Transport("reset".into()).is_transient());
        assert!(ClientError::Timeout.is_transient());
        assert!(ClientError::Server { status: 503, message: "busy".into() }.is_transient());
    }

    #[test]
    fn rejections_are_not_transient() {
        assert!(!ClientError::Server { status: 403, message: "no".into() }.is_transient());
        assert!(!ClientError::Decode("eof".into()).is_transient());
        assert!(!ClientError::InvalidUrl("nope".into()).is_transient());
    }

    #[test]
    fn server_error_display_includes_status() {
        let err = ClientError::Server { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "server error: 500 - boom");
    }
}
