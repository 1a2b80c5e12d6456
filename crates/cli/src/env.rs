// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Resolve state directory: AUTOFIX_STATE_DIR > XDG_STATE_HOME/autofix > ~/.local/state/autofix
pub fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = non_empty("AUTOFIX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("autofix"));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot resolve a state directory"))?;
    Ok(home.join(".local/state/autofix"))
}

/// Tracing filter directives (default `info`)
pub fn log_filter() -> String {
    non_empty("AUTOFIX_LOG").unwrap_or_else(|| "info".to_string())
}

pub fn agent_program() -> Option<String> {
    non_empty("AUTOFIX_AGENT_PROGRAM")
}

pub fn default_model() -> Option<String> {
    non_empty("AUTOFIX_DEFAULT_MODEL")
}

/// Ignored unless it parses as a positive integer.
pub fn max_concurrent_jobs() -> Option<usize> {
    non_empty("AUTOFIX_MAX_CONCURRENT_JOBS")
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
