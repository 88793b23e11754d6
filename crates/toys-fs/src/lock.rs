//! Advisory lock files with bounded acquisition
//!
//! State files are replaced by rename, so the lock lives on a sibling
//! `<name>.lock` file whose inode never changes. Acquisition retries a
//! non-blocking try-lock with exponential backoff until the configured
//! timeout elapses.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, Result};

/// Kind of advisory lock to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers at once
    Shared,
    /// A single writer, excluding readers
    Exclusive,
}

/// A held advisory lock; released when dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    /// Path of the lock file guarding `target`.
    pub fn lock_path_for(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        target.with_file_name(name)
    }

    /// Acquire an exclusive lock guarding `target`.
    pub fn exclusive(target: &Path, timeout: Duration) -> Result<Self> {
        Self::acquire(target, LockMode::Exclusive, timeout)
    }

    /// Acquire a shared lock guarding `target`.
    pub fn shared(target: &Path, timeout: Duration) -> Result<Self> {
        Self::acquire(target, LockMode::Shared, timeout)
    }

    /// Acquire a lock of the given mode guarding `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] if another holder keeps the lock for
    /// longer than `timeout`, or [`Error::Io`] if the lock file cannot be
    /// opened.
    pub fn acquire(target: &Path, mode: LockMode, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path_for(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(5))
            .with_max_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(timeout))
            .build();

        let contended = fs2::lock_contended_error();
        let attempt = || {
            // Called through the trait: std's inherent `File` lock methods
            // shadow fs2's and have different error types.
            let outcome = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            outcome.map_err(|e| {
                if e.raw_os_error() == contended.raw_os_error() || e.kind() == contended.kind() {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        match backoff::retry(policy, attempt) {
            Ok(()) => {
                tracing::debug!(lock = %path.display(), ?mode, "lock acquired");
                Ok(Self { file, path, mode })
            }
            Err(backoff::Error::Permanent(e)) => Err(Error::io(&path, e)),
            Err(backoff::Error::Transient { .. }) => Err(Error::LockTimeout {
                path,
                waited: timeout,
            }),
        }
    }

    /// Path of the underlying lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode this lock was acquired in
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        } else {
            tracing::debug!(lock = %self.path.display(), "lock released");
        }
    }
}
