use thiserror::Error;

/// Errors returned by connector operations.
///
/// Every failure is a value; nothing in the connector layer panics on bad
/// upstream data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    /// Empty or malformed URL, query or chapter number.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// URL host is not in the connector's allow-list.
    #[error("Host {host} is not served by connector {connector}")]
    HostMismatch { host: String, connector: String },

    /// URL path does not look like an item page for this site.
    #[error("Unrecognised item URL format: {0}")]
    FormatMismatch(String),

    /// The response was fine but did not contain the requested item.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-2xx response (after any applicable retries).
    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Malformed JSON/HTML or a missing required field.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Still rate limited after exhausting the retry budget.
    #[error("Rate limited by {url} after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },

    /// Network-level failure before a status line was received.
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Operation not offered by this connector.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ConnectorError {
    /// True for errors caused by the caller's context rather than upstream.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// True for a terminal rate-limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectorError::HostMismatch {
            host: "example.com".to_string(),
            connector: "mgeko".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Host example.com is not served by connector mgeko"
        );

        let err = ConnectorError::UpstreamStatus {
            status: 503,
            url: "https://www.mgeko.cc/".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream returned HTTP 503 for https://www.mgeko.cc/"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(ConnectorError::Cancelled.is_cancellation());
        assert!(ConnectorError::DeadlineExceeded.is_cancellation());
        assert!(!ConnectorError::NotFound("x".into()).is_cancellation());
        assert!(ConnectorError::RateLimited {
            url: "u".into(),
            attempts: 4
        }
        .is_rate_limited());
    }
}
