//! [`TestLedger`]: a temporary directory with a ledger file path inside it.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch location for a job ledger; removed when dropped.
pub struct TestLedger {
    temp_dir: TempDir,
    path: PathBuf,
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger {
    /// Create an empty temporary directory; the ledger file does not exist yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("spawn").join("jobs.toml");
        Self { temp_dir, path }
    }

    /// Root of the scratch directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path the ledger lives at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write raw content to the ledger path, bypassing the ledger API.
    pub fn write_raw(&self, content: &str) {
        fs::create_dir_all(self.path.parent().unwrap()).unwrap();
        fs::write(&self.path, content).unwrap();
    }

    /// Read the ledger file's raw content.
    pub fn read_raw(&self) -> String {
        fs::read_to_string(&self.path).unwrap()
    }
}
