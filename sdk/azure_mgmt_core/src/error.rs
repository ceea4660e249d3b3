use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request payload could not be serialized, or a response body could
    /// not be deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A transport collaborator other than the built-in HTTP client failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// The API returned an error response.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The service reported that a long-running operation failed.
    #[error("Operation failed: {reason}")]
    OperationFailed { reason: String },

    /// The service reported that a long-running operation was canceled.
    #[error("Operation was canceled by the service")]
    OperationCanceled,

    /// Polling did not reach a terminal status before the deadline.
    #[error("Polling timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// `next_page` was called after the last page had been returned.
    #[error("Pager has no more pages")]
    ExhaustedPager,

    /// A caller-supplied argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's cancellation signal fired before the next request.
    #[error("Canceled before the next request was issued")]
    Canceled,
}

impl ArmError {
    /// Build an [`ArmError::Http`] error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Build an [`ArmError::InvalidEndpoint`] error carrying the parse failure.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns `true` for failures of a single round trip that are worth
    /// retrying: connection-level errors, throttling and server errors.
    ///
    /// These leave poller and pager state untouched, so the caller may retry
    /// `poll()` or `next_page()`. Client errors such as 404 or 409 are not
    /// transport errors.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Request(_) | Self::Transport(_) => true,
            Self::Http { status, .. } | Self::Api { status, .. } => {
                crate::client::is_retriable_status(*status)
            }
            _ => false,
        }
    }
}

/// Result type alias for Azure Resource Manager operations.
pub type ArmResult<T> = std::result::Result<T, ArmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(ArmError::Transport("connection reset".into()).is_transport());
        assert!(ArmError::http(503, "Service Unavailable").is_transport());
        assert!(ArmError::Api {
            status: 429,
            code: "TooManyRequests".into(),
            message: "slow down".into()
        }
        .is_transport());

        assert!(!ArmError::http(404, "Not Found").is_transport());
        assert!(!ArmError::Api {
            status: 409,
            code: "Conflict".into(),
            message: "busy".into()
        }
        .is_transport());
        assert!(!ArmError::Api {
            status: 404,
            code: "ResourceNotFound".into(),
            message: "gone".into()
        }
        .is_transport());

        assert!(!ArmError::ExhaustedPager.is_transport());
        assert!(!ArmError::OperationCanceled.is_transport());
        assert!(!ArmError::OperationFailed {
            reason: "boom".into()
        }
        .is_transport());
        assert!(!ArmError::Timeout {
            elapsed: Duration::from_secs(1)
        }
        .is_transport());
    }

    #[test]
    fn display_includes_reason() {
        let err = ArmError::OperationFailed {
            reason: "quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "Operation failed: quota exceeded");
    }

    #[test]
    fn invalid_endpoint_keeps_source() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = ArmError::invalid_endpoint_with_source("invalid endpoint URL", parse_err);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("invalid endpoint URL"));
    }
}
