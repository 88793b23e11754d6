//! Spawn launcher: create a sub-agent conversation and record the job

use toys_host::{HostError, HostPlatform, LaunchRequest};

use crate::job::Job;
use crate::ledger::JobLedger;
use crate::{Error, Result};

/// Parameters for one launch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Working directory for the sub-agent
    pub cwd: Option<String>,
    /// Model for the sub-agent
    pub model: Option<String>,
}

/// Launches sub-agent tasks on a host and registers them in a ledger
#[derive(Debug)]
pub struct SpawnLauncher<'a, H> {
    host: H,
    ledger: &'a JobLedger,
    default_model: String,
    default_cwd: String,
}

impl<'a, H: HostPlatform> SpawnLauncher<'a, H> {
    /// Create a launcher; `default_model` and `default_cwd` fill in
    /// whatever a launch leaves unspecified.
    pub fn new(
        host: H,
        ledger: &'a JobLedger,
        default_model: impl Into<String>,
        default_cwd: impl Into<String>,
    ) -> Self {
        Self {
            host,
            ledger,
            default_model: default_model.into(),
            default_cwd: default_cwd.into(),
        }
    }

    /// Create a remote conversation seeded with `task` and append a pending
    /// job for it.
    ///
    /// The ledger is checked before the host is contacted, and the job is
    /// written only after the host has confirmed the remote handle; a refused
    /// or failed launch leaves the ledger untouched. The task text is sent and
    /// stored as given.
    pub fn launch(&self, task: &str, options: &LaunchOptions) -> Result<Job> {
        if task.trim().is_empty() {
            return Err(Error::EmptyTask);
        }
        self.ledger.ensure_writable()?;

        let request = LaunchRequest {
            message: task.to_string(),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            cwd: options
                .cwd
                .clone()
                .unwrap_or_else(|| self.default_cwd.clone()),
        };

        let handle = self
            .host
            .create_conversation(&request)
            .map_err(|e| match e {
                HostError::Rejected { status, body } => Error::LaunchRejected {
                    status,
                    reason: body,
                },
                other => Error::HostUnavailable {
                    message: other.to_string(),
                },
            })?;

        let job = Job::pending(handle, task, Some(request.cwd), Some(request.model));
        if let Err(e) = self.ledger.append(job.clone()) {
            tracing::error!(handle = %job.remote_handle, error = %e, "sub-agent started but not recorded");
            return Err(Error::Unrecorded {
                handle: job.remote_handle,
                source: Box::new(e),
            });
        }

        tracing::info!(
            id = %job.id,
            handle = %job.remote_handle,
            model = job.model.as_deref().unwrap_or_default(),
            "launched sub-agent"
        );
        Ok(job)
    }
}
