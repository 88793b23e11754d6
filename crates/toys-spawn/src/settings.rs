//! User settings for the spawn tools
//!
//! Read from the `[spawn]` table of `~/.config/shelley/power-toys.toml`.
//! Every field is optional; command-line flags and environment variables
//! override whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toys_fs::{ConfigStore, RobustnessConfig};
use toys_host::{DEFAULT_API_BASE, DEFAULT_USER_ID, HostConfig};

use crate::Result;
use crate::wait::WaitOptions;

/// Model used when a launch does not name one
pub const DEFAULT_MODEL: &str = "claude-opus-4.5";

const CONFIG_DIR: &str = ".config/shelley";
const SETTINGS_FILE: &str = "power-toys.toml";
const LEDGER_FILE: &str = "power-toys-spawn.toml";

/// Settings for `toys spawn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Ledger file; defaults to `~/.config/shelley/power-toys-spawn.toml`
    pub ledger: Option<PathBuf>,
    pub api: String,
    pub user_id: String,
    pub model: String,
    pub poll_interval_ms: u64,
    pub lock_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            ledger: None,
            api: DEFAULT_API_BASE.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval_ms: 2_000,
            lock_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    spawn: SpawnSettings,
}

impl SpawnSettings {
    /// `~/.config/shelley`, or a relative `.config/shelley` without a home
    pub fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_default().join(CONFIG_DIR)
    }

    /// Default location of the settings file
    pub fn default_path() -> PathBuf {
        Self::config_dir().join(SETTINGS_FILE)
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from `path` (TOML or JSON by extension); a missing file yields
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file: Option<SettingsFile> = ConfigStore::new().load_optional(path)?;
        let settings = file.map(|f| f.spawn).unwrap_or_default();
        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    /// Ledger file to use
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(LEDGER_FILE))
    }

    /// Poll interval, clamped into the supported range
    pub fn poll_interval(&self) -> Duration {
        WaitOptions::clamp_interval(Duration::from_millis(self.poll_interval_ms))
    }

    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            base_url: self.api.clone(),
            user_id: self.user_id.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            ..RobustnessConfig::default()
        }
    }
}
