//! Error types for toys-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Process exit codes
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// Bad input, corrupt ledger, refused launch, lock timeout
    pub const ERROR: i32 = 1;
    /// A wait reached its deadline
    pub const TIMED_OUT: i32 = 2;
    /// A wait was interrupted with Ctrl-C
    pub const INTERRUPTED: i32 = 130;
}

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from toys-spawn
    #[error(transparent)]
    Spawn(#[from] toys_spawn::Error),

    /// Error from toys-host
    #[error(transparent)]
    Host(#[from] toys_host::HostError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Extra lines worth showing under the error message
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Spawn(toys_spawn::Error::AmbiguousId { matches, .. }) => {
                Some(format!("matching jobs: {}", matches.join(", ")))
            }
            Self::Spawn(toys_spawn::Error::LedgerCorrupt { path, .. }) => Some(format!(
                "the file was left untouched; fix or move {} and retry",
                path.display()
            )),
            Self::Spawn(toys_spawn::Error::Unrecorded { handle, .. }) => Some(format!(
                "conversation {handle} is running on the host but is not in the ledger"
            )),
            _ => None,
        }
    }
}
