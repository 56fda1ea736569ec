//! Planner configuration.
//!
//! Loaded from a YAML file in the user dir (`~/.dayplan/config.yaml`, or
//! `$DAYPLAN_USER_DIR/config.yaml`), with every field optional. A missing
//! file means defaults.

use crate::error::{Error, Result};
use crate::order::SomedayPlacement;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User-facing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Path to the SQLite database file.
    pub database: Option<PathBuf>,
    /// Where new someday tasks land among their siblings.
    pub someday_placement: SomedayPlacement,
}

impl PlannerConfig {
    /// Load from an explicit path, or from the discovered user dir.
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match user_dir() {
                Some(dir) => dir.join("config.yaml"),
                None => {
                    warn!("no home directory found; using default config");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            if explicit.is_some() {
                return Err(Error::invalid_value(
                    "config",
                    format!("config file not found: {}", path.display()),
                ));
            }
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| Error::internal(format!("failed to read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw).map_err(|e| {
            Error::invalid_value("config", format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// The database path to use: explicit override, then config, then the
    /// default under the user dir.
    pub fn database_path(&self, override_path: Option<&Path>) -> PathBuf {
        if let Some(p) = override_path {
            return p.to_path_buf();
        }
        if let Some(p) = &self.database {
            return p.clone();
        }
        user_dir()
            .map(|dir| dir.join("dayplan.db3"))
            .unwrap_or_else(|| PathBuf::from("dayplan.db3"))
    }
}

/// User dir: `$DAYPLAN_USER_DIR` or `~/.dayplan`.
pub fn user_dir() -> Option<PathBuf> {
    std::env::var("DAYPLAN_USER_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".dayplan")))
}
