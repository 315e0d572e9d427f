//! Error types for query orchestration
//!
//! Transport and backend failures propagate into orchestrator state; teardown
//! and listener management never produce errors. Stale deliveries are dropped
//! silently and never surface here.

use thiserror::Error;

/// Errors surfaced by the remote search client and the fetch orchestrators
#[derive(Debug, Error)]
pub enum SearchError {
    /// The underlying HTTP transport failed
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("search backend returned HTTP {status}")]
    Http { status: u16, body: String },

    /// The response body could not be decoded
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A combined query returned a different number of responses than
    /// indices requested
    #[error("response count mismatch: expected {expected}, got {got}")]
    ResponseCountMismatch { expected: usize, got: usize },

    /// The endpoint URL could not be built
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl SearchError {
    /// Whether this error came from the network rather than from decoding
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = SearchError::Http {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "search backend returned HTTP 503");
        assert!(err.is_transport());
    }

    #[test]
    fn test_count_mismatch_display() {
        let err = SearchError::ResponseCountMismatch {
            expected: 2,
            got: 1,
        };
        assert!(err.to_string().contains("expected 2"));
        assert!(!err.is_transport());
    }
}
