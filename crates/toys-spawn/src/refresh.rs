//! One-shot refresh of ledger entries for `check` and `list`

use serde::Serialize;

use crate::Result;
use crate::job::Job;
use crate::ledger::JobLedger;
use crate::resolver::Resolver;

/// How current a reported job is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Freshness {
    /// Terminal; never queried again
    Terminal,
    /// Queried just now
    Refreshed,
    /// The host could not be asked; this is the last recorded status
    Stale(String),
    /// Refresh was skipped on request
    Cached,
}

/// A job together with how current its status is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub freshness: Freshness,
}

impl JobView {
    /// Wrap a job read straight from the ledger.
    pub fn cached(job: Job) -> Self {
        let freshness = if job.is_terminal() {
            Freshness::Terminal
        } else {
            Freshness::Cached
        };
        Self { job, freshness }
    }
}

/// Ask the resolver once about `job` and persist any change.
///
/// Terminal jobs are returned as-is. An unreachable host leaves the ledger
/// untouched and marks the view [`Freshness::Stale`].
pub fn refresh_job<R: Resolver>(ledger: &JobLedger, resolver: &R, job: Job) -> Result<JobView> {
    if job.is_terminal() {
        return Ok(JobView {
            job,
            freshness: Freshness::Terminal,
        });
    }

    let resolution = match resolver.resolve(&job.remote_handle) {
        Ok(resolution) => resolution,
        Err(unavailable) => {
            return Ok(JobView {
                job,
                freshness: Freshness::Stale(unavailable.reason),
            });
        }
    };

    let job = if job.would_change(&resolution) {
        let updated = ledger.update(&job.id, |j| {
            j.apply(&resolution);
        })?;
        tracing::info!(id = %updated.id, status = %updated.status, "job status changed");
        updated
    } else {
        job
    };

    Ok(JobView {
        job,
        freshness: Freshness::Refreshed,
    })
}

/// [`refresh_job`] over a list, in order.
pub fn refresh_all<R: Resolver>(
    ledger: &JobLedger,
    resolver: &R,
    jobs: Vec<Job>,
) -> Result<Vec<JobView>> {
    jobs.into_iter()
        .map(|job| refresh_job(ledger, resolver, job))
        .collect()
}
