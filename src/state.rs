//! Persisted record of what converge manages (stateful mode)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Spec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Name of the state file inside the state directory
pub const STATE_FILE: &str = "state.toml";

/// Entities applied by previous passes, per backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergeState {
    /// Last time the state was updated
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub backends: BTreeMap<String, BackendState>,
}

/// What one backend was last converged to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendState {
    pub last_applied: Option<DateTime<Utc>>,

    /// Desired list of the last successful apply
    #[serde(default)]
    pub managed: Vec<Spec>,
}

impl ConvergeState {
    /// Get the state file path
    pub fn state_file() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(STATE_FILE))
    }

    /// Load state from disk, or return default if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::state_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize state to TOML")?;
        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Entities a backend managed after its last apply
    pub fn managed(&self, backend: &str) -> &[Spec] {
        self.backends
            .get(backend)
            .map(|b| b.managed.as_slice())
            .unwrap_or_default()
    }

    /// Record that `backend` now manages exactly `desired`
    pub fn record_applied(&mut self, backend: &str, desired: &[Spec]) {
        let now = Utc::now();
        let entry = self.backends.entry(backend.to_string()).or_default();
        entry.managed = desired.to_vec();
        entry.last_applied = Some(now);
        self.last_updated = Some(now);
    }
}
