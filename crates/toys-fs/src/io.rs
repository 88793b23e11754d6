//! Atomic I/O operations

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Tuning knobs for state-file I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long lock acquisition may retry before giving up
    pub lock_timeout: Duration,
    /// Flush written content to disk before the rename
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            enable_fsync: true,
        }
    }
}

/// Replace the content of `path` atomically.
///
/// Content goes to a uniquely named temp file in the same directory (same
/// filesystem), which is then renamed over the target. Readers observe
/// either the old or the new content, never a partial write.
///
/// This does not serialize writers; callers that read-modify-write must
/// hold a [`crate::FileLock`] across the whole cycle.
pub fn write_atomic(path: &Path, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(
            ".{}.",
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default()
        ))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    temp.write_all(content)
        .map_err(|e| Error::io(temp.path(), e))?;

    if config.enable_fsync {
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io(temp.path(), e))?;
    }

    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    tracing::trace!(path = %path.display(), bytes = content.len(), "replaced file atomically");
    Ok(())
}

/// Read text content from a file, `None` if it does not exist.
pub fn read_text_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
