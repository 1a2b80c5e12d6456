// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-agent output logs.
//!
//! Each agent writes combined stdout/stderr to:
//!   `<log_dir>/agent/<agent_id>.log`
//!
//! The first line is a `#` header; everything after it is raw process output.

use af_core::AgentId;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub struct AgentLogger {
    log_dir: PathBuf,
}

impl AgentLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Return the path to an agent's log file.
    pub fn log_path(&self, agent_id: &AgentId) -> PathBuf {
        self.log_dir.join("agent").join(format!("{}.log", agent_id))
    }

    /// Create (or truncate) the agent log with its header line.
    pub fn create(&self, agent_id: &AgentId, header: &str) -> std::io::Result<PathBuf> {
        let path = self.log_path(agent_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::File::create(&path)?;
        writeln!(file, "# {header}")?;
        Ok(path)
    }

    /// Spawn a task that appends every received line to `path`.
    ///
    /// The task ends once all senders are dropped. Write failures are logged
    /// and the remaining lines are drained so readers never block.
    pub fn spawn_writer(
        path: PathBuf,
        mut rx: mpsc::Receiver<String>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut writer = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(BufWriter::new(file)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to open agent log");
                    None
                }
            };
            while let Some(line) = rx.recv().await {
                let Some(out) = writer.as_mut() else {
                    continue;
                };
                // Flush per line so log readers see live output
                let result = writeln!(out, "{line}").and_then(|()| out.flush());
                if let Err(e) = result {
                    tracing::warn!(path = %path.display(), error = %e, "failed to write agent log");
                    writer = None;
                }
            }
        })
    }
}

/// Last `n` output lines of an agent log, header excluded.
pub fn read_tail(path: &Path, n: usize) -> Vec<String> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().skip(1).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
#[path = "agent_logger_tests.rs"]
mod tests;
