//! Job records and their status machine
//!
//! A job is one launched sub-agent task. Its status only ever advances:
//!
//! ```text
//! pending ──► running ──► completed
//!    │           ▲  │
//!    │           │  └───► failed
//!    │           ▼
//!    │       timed_out
//!    └──────────────────► completed | failed
//! ```
//!
//! `timed_out` shares its rank with `running`: it only records that some
//! caller stopped waiting, and any later remote observation supersedes it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolver::Resolution;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Launched, not yet observed
    Pending,
    /// Remote conversation has an open turn
    Running,
    /// Remote agent finished its turn
    Completed,
    /// Remote host reported an execution error
    Failed,
    /// A waiter gave up; true remote state unknown
    TimedOut,
}

impl JobStatus {
    /// All statuses, in declaration order
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::TimedOut,
    ];

    /// Position along the lifecycle; transitions never lower it.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running | Self::TimedOut => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether no further transitions follow
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is permitted.
    pub fn can_become(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s || (s == "timed-out" && *status == Self::TimedOut))
            .ok_or_else(|| {
                format!(
                    "unknown status '{}' (expected one of: pending, running, completed, failed, timed_out)",
                    s
                )
            })
    }
}

/// One tracked sub-agent task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Local identifier, assigned at creation
    pub id: String,
    /// Conversation id on the host platform
    pub remote_handle: String,
    /// Instruction text given to the sub-agent
    pub task: String,
    /// Working directory the sub-agent was launched in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Model the sub-agent runs on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Final output (completed) or error text (failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// When the job was launched
    pub created_at: DateTime<Utc>,
    /// When the job first reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job for a freshly created remote conversation.
    pub fn pending(
        remote_handle: impl Into<String>,
        task: impl Into<String>,
        cwd: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_handle: remote_handle.into(),
            task: task.into(),
            cwd,
            model,
            status: JobStatus::Pending,
            result: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether the job has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fold a remote observation into this job.
    ///
    /// Terminal jobs are left untouched. Returns whether anything changed.
    pub fn apply(&mut self, resolution: &Resolution) -> bool {
        if self.is_terminal() {
            return false;
        }

        let (status, result) = match resolution {
            Resolution::Running => (JobStatus::Running, None),
            Resolution::Completed(text) => (JobStatus::Completed, Some(text.clone())),
            Resolution::Failed(error) => (JobStatus::Failed, Some(error.clone())),
        };

        if self.status == status && self.result == result {
            return false;
        }
        self.status = status;
        self.result = result;
        true
    }

    /// Whether applying `resolution` would change this job
    pub fn would_change(&self, resolution: &Resolution) -> bool {
        self.clone().apply(resolution)
    }
}
