//! Error types for host platform calls

/// Errors returned by a host platform
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The host answered and refused the request
    #[error("Host rejected request (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, as sent by the host
        body: String,
    },

    /// The host could not be reached or answered with a transient failure
    #[error("Host unavailable: {message}")]
    Unavailable {
        /// What went wrong
        message: String,
    },

    /// The host answered with a body we could not interpret
    #[error("Invalid response from host: {message}")]
    InvalidResponse {
        /// Decoder message
        message: String,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl HostError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::InvalidResponse { .. })
    }
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;
