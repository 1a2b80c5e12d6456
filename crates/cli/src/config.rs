// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autofix.toml` loading.
//!
//! ```toml
//! [automation]
//! max_concurrent_jobs = 1
//!
//! [agent]
//! program = "opencode"
//! args = ["run", "--model", "{model}", "{prompt}"]
//!
//! [violations]
//! reports_dir = "/var/lib/scanner/reports"
//!
//! [scan]
//! command = ["scanner", "rescan", "{target}", "--type", "{type}"]
//! ```
//!
//! Every key is optional. Environment overrides are applied last.

use crate::env;
use af_core::{AgentSettings, AutomationSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "autofix.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub automation: AutomationSettings,
    pub agent: AgentSettings,
    pub violations: ViolationsConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationsConfig {
    /// Holds `<target>/<type>.json` reports; defaults to `<state_dir>/reports`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Argument template with `{target}` and `{type}`; empty skips re-scans
    pub command: Vec<String>,
}

impl Config {
    /// Load `explicit` if given (it must exist), else `<state_dir>/autofix.toml`
    /// when present, else defaults. Environment overrides apply either way.
    pub fn load(explicit: Option<&Path>, state_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::read(path)?,
            None => {
                let path = state_dir.join(CONFIG_FILE);
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(program) = env::agent_program() {
            self.agent.program = program;
        }
        if let Some(model) = env::default_model() {
            self.agent.default_model = model;
        }
        if let Some(max) = env::max_concurrent_jobs() {
            self.automation.max_concurrent_jobs = max;
        }
    }

    pub fn reports_dir(&self, state_dir: &Path) -> PathBuf {
        self.violations.reports_dir.clone().unwrap_or_else(|| state_dir.join("reports"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
