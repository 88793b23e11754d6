//! Job ledger: the durable record of every launched job
//!
//! The ledger is a single TOML file shared by every invocation of the tool.
//! Writers hold an exclusive lock on a sibling lock file for exactly one
//! read-modify-write cycle and replace the data file atomically, so
//! overlapping invocations serialize instead of clobbering each other.
//! Readers take a shared lock. No lock is ever held across a network call.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use toys_fs::{FileLock, RobustnessConfig, io};

use crate::job::Job;
use crate::{Error, Result};

/// Current on-disk format version
const LEDGER_VERSION: &str = "1";

/// Shortest id prefix accepted by [`JobLedger::resolve_id`]
pub const MIN_PREFIX_LEN: usize = 4;

/// On-disk representation
///
/// Unknown fields, at the top level or inside a job, are ignored so older
/// binaries can read ledgers written by newer ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    jobs: Vec<Job>,
}

fn default_version() -> String {
    LEDGER_VERSION.to_string()
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            jobs: Vec::new(),
        }
    }
}

/// Handle on the ledger file at a fixed path
#[derive(Debug, Clone)]
pub struct JobLedger {
    path: PathBuf,
    robustness: RobustnessConfig,
}

impl JobLedger {
    /// Open the ledger at `path`; the file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            robustness: RobustnessConfig::default(),
        }
    }

    /// Override lock timeout and fsync behaviour.
    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a new job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if a job with the same id exists, or
    /// [`Error::LedgerCorrupt`] if the existing file cannot be parsed (it is
    /// never overwritten in that case).
    pub fn append(&self, job: Job) -> Result<()> {
        let _lock = FileLock::exclusive(&self.path, self.robustness.lock_timeout)?;
        let mut file = self.read()?;

        if file.jobs.iter().any(|j| j.id == job.id) {
            return Err(Error::DuplicateId { id: job.id });
        }

        tracing::debug!(id = %job.id, handle = %job.remote_handle, "appending job");
        file.jobs.push(job);
        self.write(&file)
    }

    /// Confirm the ledger can take a write: the lock is obtainable and the
    /// existing content parses. Nothing is written.
    pub fn ensure_writable(&self) -> Result<()> {
        let _lock = FileLock::exclusive(&self.path, self.robustness.lock_timeout)?;
        self.read().map(|_| ())
    }

    /// Atomically read a job, apply `mutator` to it, and write it back.
    ///
    /// The mutation is validated before anything is written: status may only
    /// advance, terminal jobs are frozen, and fields fixed at creation cannot
    /// change. `resolved_at` is stamped on the first transition into a
    /// terminal status. Returns the job as persisted.
    pub fn update<F>(&self, id: &str, mutator: F) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        let _lock = FileLock::exclusive(&self.path, self.robustness.lock_timeout)?;
        let mut file = self.read()?;

        let slot = file
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;

        let before = slot.clone();
        let mut after = before.clone();
        mutator(&mut after);
        validate_update(&before, &mut after)?;

        if after == before {
            return Ok(after);
        }

        tracing::debug!(%id, from = %before.status, to = %after.status, "updating job");
        *slot = after.clone();
        self.write(&file)?;
        Ok(after)
    }

    /// All jobs in creation order
    pub fn list(&self) -> Result<Vec<Job>> {
        let _lock = FileLock::shared(&self.path, self.robustness.lock_timeout)?;
        Ok(self.read()?.jobs)
    }

    /// Get a job by exact id
    pub fn get(&self, id: &str) -> Result<Job> {
        self.list()?
            .into_iter()
            .find(|j| j.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    /// Expand a user-supplied id or unique prefix to a full job id.
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        let jobs = self.list()?;
        resolve_in(&jobs, prefix)
    }

    /// Expand several ids or prefixes against one snapshot of the ledger.
    pub fn resolve_ids<S: AsRef<str>>(&self, prefixes: &[S]) -> Result<Vec<String>> {
        let jobs = self.list()?;
        prefixes
            .iter()
            .map(|p| resolve_in(&jobs, p.as_ref()))
            .collect()
    }

    /// Ids of every job not yet in a terminal status, in creation order
    pub fn unresolved_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|j| !j.is_terminal())
            .map(|j| j.id)
            .collect())
    }

    /// Read the ledger without locking; callers hold the lock.
    fn read(&self) -> Result<LedgerFile> {
        let raw = match io::read_text_if_exists(&self.path)? {
            Some(raw) => raw,
            None => return Ok(LedgerFile::default()),
        };
        // A zero-length file is what a writer killed mid-truncate leaves
        // behind; treat it as empty rather than corrupt.
        if raw.trim().is_empty() {
            return Ok(LedgerFile::default());
        }

        toml::from_str(&raw).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "ledger failed to parse");
            Error::LedgerCorrupt {
                path: self.path.clone(),
                message: e.to_string(),
                raw,
            }
        })
    }

    fn write(&self, file: &LedgerFile) -> Result<()> {
        let content = toml::to_string_pretty(file)?;
        io::write_atomic(&self.path, content.as_bytes(), self.robustness)?;
        Ok(())
    }
}

/// Expand `prefix` against a set of jobs.
pub(crate) fn resolve_in(jobs: &[Job], prefix: &str) -> Result<String> {
    if let Some(job) = jobs.iter().find(|j| j.id == prefix) {
        return Ok(job.id.clone());
    }
    if prefix.len() < MIN_PREFIX_LEN {
        return Err(Error::NotFound {
            id: prefix.to_string(),
        });
    }

    let matches: Vec<String> = jobs
        .iter()
        .filter(|j| j.id.starts_with(prefix))
        .map(|j| j.id.clone())
        .collect();

    match matches.len() {
        0 => Err(Error::NotFound {
            id: prefix.to_string(),
        }),
        1 => Ok(matches.into_iter().next().unwrap_or_default()),
        _ => Err(Error::AmbiguousId {
            prefix: prefix.to_string(),
            matches,
        }),
    }
}

/// Check a mutation against the job invariants, stamping `resolved_at`.
fn validate_update(before: &Job, after: &mut Job) -> Result<()> {
    let id = before.id.clone();
    let immutable = |field: &'static str| Error::ImmutableField {
        id: id.clone(),
        field,
    };

    if after.id != before.id {
        return Err(immutable("id"));
    }
    if after.remote_handle != before.remote_handle {
        return Err(immutable("remote_handle"));
    }
    if after.task != before.task {
        return Err(immutable("task"));
    }
    if after.cwd != before.cwd {
        return Err(immutable("cwd"));
    }
    if after.model != before.model {
        return Err(immutable("model"));
    }
    if after.created_at != before.created_at {
        return Err(immutable("created_at"));
    }

    if !before.status.can_become(after.status) {
        return Err(Error::InvalidTransition {
            id,
            from: before.status,
            to: after.status,
        });
    }

    if before.is_terminal() {
        if after.result != before.result {
            return Err(immutable("result"));
        }
        if after.resolved_at != before.resolved_at {
            return Err(immutable("resolved_at"));
        }
        return Ok(());
    }

    if after.is_terminal() {
        if after.resolved_at.is_none() {
            after.resolved_at = Some(Utc::now());
        }
    } else {
        if after.result.is_some() {
            return Err(Error::InvalidUpdate {
                id,
                reason: format!("a {} job cannot carry a result", after.status),
            });
        }
        if after.resolved_at.is_some() {
            return Err(Error::InvalidUpdate {
                id,
                reason: format!("a {} job cannot have resolved_at", after.status),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::resolver::Resolution;
    use tempfile::tempdir;

    fn ledger_in(dir: &Path) -> JobLedger {
        JobLedger::open(dir.join("jobs.toml"))
    }

    fn job(task: &str) -> Job {
        Job::pending("c0000001", task, Some("/work".into()), None)
    }

    #[test]
    fn missing_ledger_is_empty() {
        let dir = tempdir().unwrap();
        assert!(ledger_in(dir.path()).list().unwrap().is_empty());
    }

    #[test]
    fn whitespace_ledger_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        std::fs::write(ledger.path(), "  \n").unwrap();
        assert!(ledger.list().unwrap().is_empty());
    }

    #[test]
    fn append_writes_versioned_toml() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        ledger.append(job("task A")).unwrap();

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.contains("version = \"1\""));
        assert!(raw.contains("[[jobs]]"));
        assert!(raw.contains("task = \"task A\""));
        assert!(raw.contains("status = \"pending\""));
    }

    #[test]
    fn append_rejects_duplicate_id() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let job = job("task A");
        ledger.append(job.clone()).unwrap();

        let result = ledger.append(job);
        assert!(matches!(result, Err(Error::DuplicateId { .. })));
        assert_eq!(ledger.list().unwrap().len(), 1);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let result = ledger_in(dir.path()).update("nope", |_| {});
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn update_stamps_resolved_at_once() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let job = job("task A");
        let id = job.id.clone();
        ledger.append(job).unwrap();

        let resolved = ledger
            .update(&id, |j| {
                j.apply(&Resolution::Completed("42".into()));
            })
            .unwrap();
        let stamp = resolved.resolved_at.expect("resolved_at stamped");

        let again = ledger
            .update(&id, |j| {
                j.apply(&Resolution::Completed("43".into()));
            })
            .unwrap();
        assert_eq!(again.resolved_at, Some(stamp));
        assert_eq!(again.result.as_deref(), Some("42"));
    }

    #[test]
    fn update_rejects_regression_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let job = job("task A");
        let id = job.id.clone();
        ledger.append(job).unwrap();
        ledger.update(&id, |j| j.status = JobStatus::Running).unwrap();
        let before = std::fs::read_to_string(ledger.path()).unwrap();

        let result = ledger.update(&id, |j| j.status = JobStatus::Pending);

        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), before);
    }

    #[test]
    fn update_rejects_immutable_field_change() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let job = job("task A");
        let id = job.id.clone();
        ledger.append(job).unwrap();

        let result = ledger.update(&id, |j| j.task = "task B".into());

        assert!(matches!(result, Err(Error::ImmutableField { field: "task", .. })));
    }

    #[test]
    fn update_rejects_result_on_running_job() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let job = job("task A");
        let id = job.id.clone();
        ledger.append(job).unwrap();

        let result = ledger.update(&id, |j| {
            j.status = JobStatus::Running;
            j.result = Some("early".into());
        });

        assert!(matches!(result, Err(Error::InvalidUpdate { .. })));
    }

    #[test]
    fn corrupt_ledger_is_reported_and_preserved() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        std::fs::write(ledger.path(), "[[jobs]\nid = ").unwrap();

        match ledger.list() {
            Err(Error::LedgerCorrupt { raw, .. }) => assert_eq!(raw, "[[jobs]\nid = "),
            other => panic!("expected LedgerCorrupt, got {:?}", other),
        }
        assert!(matches!(
            ledger.append(job("task A")),
            Err(Error::LedgerCorrupt { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(ledger.path()).unwrap(),
            "[[jobs]\nid = "
        );
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let mut a = job("a");
        a.id = "abcd1111-0000".into();
        let mut b = job("b");
        b.id = "abcd2222-0000".into();
        let jobs = vec![a, b];

        assert_eq!(resolve_in(&jobs, "abcd1").unwrap(), "abcd1111-0000");
        assert_eq!(resolve_in(&jobs, "abcd2222-0000").unwrap(), "abcd2222-0000");
        assert!(matches!(resolve_in(&jobs, "abcd"), Err(Error::AmbiguousId { .. })));
        assert!(matches!(resolve_in(&jobs, "abc"), Err(Error::NotFound { .. })));
        assert!(matches!(resolve_in(&jobs, "ffff"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn unresolved_ids_skip_terminal_jobs() {
        let dir = tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        let done = job("done");
        let open = job("open");
        let (done_id, open_id) = (done.id.clone(), open.id.clone());
        ledger.append(done).unwrap();
        ledger.append(open).unwrap();
        ledger
            .update(&done_id, |j| {
                j.apply(&Resolution::Failed("boom".into()));
            })
            .unwrap();

        assert_eq!(ledger.unresolved_ids().unwrap(), vec![open_id]);
    }
}
