//! Error types for toys-spawn

use std::path::PathBuf;

use crate::job::JobStatus;

/// Result type for toys-spawn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in job orchestration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A job with this id is already in the ledger
    #[error("Duplicate job id: {id}")]
    DuplicateId { id: String },

    /// No job matches the given id or prefix
    #[error("Job not found: {id}")]
    NotFound { id: String },

    /// An id prefix matches more than one job
    #[error("Job id prefix '{prefix}' is ambiguous ({} matches)", matches.len())]
    AmbiguousId { prefix: String, matches: Vec<String> },

    /// The ledger exists but cannot be parsed; the file is left untouched
    #[error("Ledger at {path} is corrupt: {message}")]
    LedgerCorrupt {
        path: PathBuf,
        message: String,
        /// Raw file content, for inspection
        raw: String,
    },

    /// A status change would move a job backwards or out of a terminal state
    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// An update tried to change a field fixed at creation
    #[error("Job {id}: field '{field}' is immutable")]
    ImmutableField { id: String, field: &'static str },

    /// An update would leave the job internally inconsistent
    #[error("Job {id}: {reason}")]
    InvalidUpdate { id: String, reason: String },

    /// The task text is empty
    #[error("Task must not be empty")]
    EmptyTask,

    /// The host platform refused to create the sub-agent conversation
    #[error("Launch rejected by host (HTTP {status}): {reason}")]
    LaunchRejected { status: u16, reason: String },

    /// The host platform could not be reached to create the conversation
    #[error("Host unavailable: {message}")]
    HostUnavailable { message: String },

    /// The host created the conversation but the job could not be written
    #[error("Sub-agent {handle} was started but could not be recorded: {source}")]
    Unrecorded {
        handle: String,
        #[source]
        source: Box<Error>,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from toys-fs
    #[error(transparent)]
    Fs(#[from] toys_fs::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Whether this is a problem with the caller's input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::AmbiguousId { .. } | Self::EmptyTask
        )
    }
}
