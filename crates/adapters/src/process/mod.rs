// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawn boundary.
//!
//! The agent manager never touches `tokio::process` directly. Everything it
//! needs from the OS is here: start argv + env + cwd, read two output
//! streams, wait for exit, force-kill. Swapping [`LocalSpawner`] for a
//! sandboxed or remote executor only requires another [`ProcessSpawner`].

mod local;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeScript, FakeSpawner};

pub use local::LocalSpawner;

use crate::template::interpolate;
use async_trait::async_trait;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Errors from the process boundary
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("failed to wait on process: {0}")]
    Wait(std::io::Error),
    #[error("failed to kill process: {0}")]
    Kill(std::io::Error),
    #[error("spawn rejected: {0}")]
    Rejected(String),
}

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: Vec::new(), cwd: None }
    }

    af_core::setters! {
        set {
            args: Vec<String>,
            env: Vec<(String, String)>,
        }
        option {
            cwd: PathBuf,
        }
    }
}

pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Short text used as the process's own error description
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Handle on a running process
#[async_trait]
pub trait ProcessControl: Send {
    /// Wait for exit. Safe to call again after [`ProcessControl::kill`].
    async fn wait(&mut self) -> Result<ExitOutcome, ProcessError>;
    /// Force-kill if still alive.
    async fn kill(&mut self) -> Result<(), ProcessError>;
}

/// A started process: two output streams plus its control handle.
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    pub stdout: Option<OutputStream>,
    pub stderr: Option<OutputStream>,
    pub control: Box<dyn ProcessControl>,
}

#[async_trait]
pub trait ProcessSpawner: Send + Sync + 'static {
    async fn spawn(&self, spec: ProcessSpec) -> Result<SpawnedProcess, ProcessError>;
}

/// Substitute `{name}` placeholders in every argument.
pub fn expand_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter().map(|arg| interpolate(arg, vars)).collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
