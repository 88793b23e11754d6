//! Invocation context
//!
//! Resolves settings from the settings file and command-line overrides into
//! the ledger and host connection every spawn command works against.

use std::path::PathBuf;

use toys_host::ShelleyClient;
use toys_spawn::{HostResolver, JobLedger, SpawnSettings};

use crate::error::Result;

/// Settings and ledger for one invocation
#[derive(Debug, Clone)]
pub struct SpawnContext {
    pub settings: SpawnSettings,
    pub ledger: JobLedger,
}

impl SpawnContext {
    /// Load settings from the default file, then apply overrides.
    pub fn load(ledger: Option<PathBuf>, api: Option<String>) -> Result<Self> {
        let settings = SpawnSettings::load()?;
        Ok(Self::with_settings(settings, ledger, api))
    }

    /// Build from explicit settings, then apply overrides.
    pub fn with_settings(
        mut settings: SpawnSettings,
        ledger: Option<PathBuf>,
        api: Option<String>,
    ) -> Self {
        if ledger.is_some() {
            settings.ledger = ledger;
        }
        if let Some(api) = api {
            settings.api = api;
        }

        let ledger = JobLedger::open(settings.ledger_path()).with_robustness(settings.robustness());
        tracing::debug!(ledger = %ledger.path().display(), api = %settings.api, "spawn context");
        Self { settings, ledger }
    }

    /// HTTP client for the configured host.
    ///
    /// Blocking: build and use it outside any async context.
    pub fn client(&self) -> Result<ShelleyClient> {
        Ok(ShelleyClient::new(self.settings.host_config())?)
    }

    /// Status resolver backed by the configured host
    pub fn resolver(&self) -> Result<HostResolver<ShelleyClient>> {
        Ok(HostResolver::new(self.client()?))
    }
}
