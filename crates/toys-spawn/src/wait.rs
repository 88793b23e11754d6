//! Wait engine: block until tracked jobs resolve, or give up
//!
//! Waiting is polling. Each round asks the [`Resolver`] once about every
//! unresolved job and writes any change straight back to the ledger, so a
//! concurrent `check` sees progress as it happens. Between rounds the engine
//! sleeps for the poll interval, shortened so the deadline is honoured.
//!
//! Three things stop a wait: the mode's condition is met (`all` resolved, or
//! `any` one resolved), the deadline passes, or the cancel flag is raised.
//! A resolver that cannot be reached is "no news" and never fails a job.

use std::time::Duration;

use serde::Serialize;

use crate::Result;
use crate::clock::{CancelFlag, Clock, SystemClock};
use crate::job::{Job, JobStatus};
use crate::ledger::JobLedger;
use crate::resolver::Resolver;

/// Default time between poll rounds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Shortest poll interval callers may configure
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Longest poll interval callers may configure
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Sleeps are sliced so cancellation is noticed within this bound
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Stop condition for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// Every job must reach a terminal status
    All,
    /// The first job to reach a terminal status ends the wait
    Any,
}

/// How to wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    pub mode: WaitMode,
    /// `None` waits until resolved or cancelled
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            mode: WaitMode::All,
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    /// Clamp a requested poll interval into the supported range.
    pub fn clamp_interval(requested: Duration) -> Duration {
        requested.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }
}

/// What a wait reports for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed,
    /// The deadline passed before this job resolved
    TimedOut,
    /// Not resolved; the wait ended for another reason
    Pending,
}

/// Per-job result of a wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub id: String,
    pub outcome: Outcome,
    /// Status as last observed, and as recorded in the ledger
    pub last_known: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Why a wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitEnd {
    Resolved,
    TimedOut,
    Interrupted,
}

/// Result of a wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitReport {
    pub mode: WaitMode,
    pub end: WaitEnd,
    /// In `any` mode, the job that ended the wait
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub outcomes: Vec<JobOutcome>,
    pub rounds: u32,
    pub elapsed_ms: u64,
}

impl WaitReport {
    pub fn timed_out(&self) -> bool {
        self.end == WaitEnd::TimedOut
    }

    pub fn outcome(&self, id: &str) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}

/// Polls a resolver for a set of jobs until a stop condition holds
#[derive(Debug)]
pub struct WaitEngine<'a, R, C = SystemClock> {
    ledger: &'a JobLedger,
    resolver: R,
    clock: C,
    cancel: CancelFlag,
}

impl<'a, R: Resolver> WaitEngine<'a, R, SystemClock> {
    pub fn new(ledger: &'a JobLedger, resolver: R) -> Self {
        Self {
            ledger,
            resolver,
            clock: SystemClock,
            cancel: CancelFlag::new(),
        }
    }
}

impl<'a, R: Resolver, C: Clock> WaitEngine<'a, R, C> {
    /// Use a different time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> WaitEngine<'a, R, C2> {
        WaitEngine {
            ledger: self.ledger,
            resolver: self.resolver,
            clock,
            cancel: self.cancel,
        }
    }

    /// Stop early when `cancel` is raised.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Wait on the jobs with the given full ids.
    ///
    /// # Errors
    ///
    /// Fails up front with [`crate::Error::NotFound`] if an id is unknown,
    /// and mid-wait only on ledger errors. Unreachable resolvers and
    /// deadlines are reported in the [`WaitReport`], not as errors.
    pub fn wait(&self, ids: &[String], options: &WaitOptions) -> Result<WaitReport> {
        let started = self.clock.now();
        // A deadline past the representable range is no deadline at all.
        let deadline = options.timeout.and_then(|t| started.checked_add(t));
        let mut jobs = self.load_targets(ids)?;
        let mut rounds = 0u32;

        tracing::debug!(
            jobs = jobs.len(),
            mode = ?options.mode,
            timeout = ?options.timeout,
            interval = ?options.poll_interval,
            "waiting"
        );

        let (end, winner) = if jobs.is_empty() {
            (WaitEnd::Resolved, None)
        } else {
            loop {
                if let Some(winner) = settled(&jobs, options.mode) {
                    break (WaitEnd::Resolved, winner);
                }
                if self.cancel.is_cancelled() {
                    break (WaitEnd::Interrupted, None);
                }
                if rounds > 0 {
                    let now = self.clock.now();
                    let pause = match deadline {
                        Some(d) if now >= d => break (WaitEnd::TimedOut, None),
                        Some(d) => options.poll_interval.min(d - now),
                        None => options.poll_interval,
                    };
                    if !self.pause(pause) {
                        break (WaitEnd::Interrupted, None);
                    }
                }

                rounds += 1;
                if let Some(id) = self.poll_round(&mut jobs, options.mode)? {
                    break (WaitEnd::Resolved, Some(id));
                }
            }
        };

        let elapsed = self.clock.now().saturating_duration_since(started);
        tracing::info!(?end, rounds, elapsed_ms = elapsed.as_millis() as u64, "wait finished");

        Ok(WaitReport {
            mode: options.mode,
            end,
            winner,
            outcomes: jobs.iter().map(|job| outcome_for(job, end)).collect(),
            rounds,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    fn load_targets(&self, ids: &[String]) -> Result<Vec<Job>> {
        let all = self.ledger.list()?;
        let mut targets: Vec<Job> = Vec::with_capacity(ids.len());
        for id in ids {
            if targets.iter().any(|j| &j.id == id) {
                continue;
            }
            let job = all
                .iter()
                .find(|j| &j.id == id)
                .cloned()
                .ok_or_else(|| crate::Error::NotFound { id: id.clone() })?;
            targets.push(job);
        }
        Ok(targets)
    }

    /// Query every unresolved job once. In `any` mode, returns the id of the
    /// first job observed terminal without querying the rest.
    fn poll_round(&self, jobs: &mut [Job], mode: WaitMode) -> Result<Option<String>> {
        for job in jobs.iter_mut().filter(|j| !j.is_terminal()) {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            match self.resolver.resolve(&job.remote_handle) {
                Ok(resolution) => {
                    if job.would_change(&resolution) {
                        *job = self.ledger.update(&job.id, |j| {
                            j.apply(&resolution);
                        })?;
                        tracing::info!(id = %job.id, status = %job.status, "job status changed");
                    }
                }
                Err(unavailable) => {
                    tracing::debug!(id = %job.id, reason = %unavailable.reason, "no information this round");
                    // Another process may have recorded progress meanwhile.
                    let stored = self.ledger.get(&job.id)?;
                    if stored != *job {
                        tracing::info!(id = %job.id, status = %stored.status, "job changed in ledger");
                        *job = stored;
                    }
                }
            }

            if mode == WaitMode::Any && job.is_terminal() {
                return Ok(Some(job.id.clone()));
            }
        }
        Ok(None)
    }

    /// Sleep for `duration` in cancellable slices; false if cancelled.
    fn pause(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if remaining.is_zero() {
                return true;
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL);
            self.clock.sleep(step);
            remaining -= step;
        }
    }
}

/// `Some(winner)` if the stop condition for `mode` already holds.
fn settled(jobs: &[Job], mode: WaitMode) -> Option<Option<String>> {
    match mode {
        WaitMode::All => jobs.iter().all(Job::is_terminal).then_some(None),
        WaitMode::Any => jobs
            .iter()
            .find(|j| j.is_terminal())
            .map(|j| Some(j.id.clone())),
    }
}

fn outcome_for(job: &Job, end: WaitEnd) -> JobOutcome {
    let outcome = match job.status {
        JobStatus::Completed => Outcome::Completed,
        JobStatus::Failed => Outcome::Failed,
        _ if end == WaitEnd::TimedOut => Outcome::TimedOut,
        _ => Outcome::Pending,
    };
    JobOutcome {
        id: job.id.clone(),
        outcome,
        last_known: job.status,
        result: job.result.clone(),
    }
}
