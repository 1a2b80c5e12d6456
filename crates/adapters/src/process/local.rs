// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local child processes via `tokio::process`.

use super::{
    ExitOutcome, OutputStream, ProcessControl, ProcessError, ProcessSpawner, ProcessSpec,
    SpawnedProcess,
};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawns processes on the local host with the current environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalSpawner;

impl LocalSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessSpawner for LocalSpawner {
    async fn spawn(&self, spec: ProcessSpec) -> Result<SpawnedProcess, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|source| ProcessError::Spawn { program: spec.program.clone(), source })?;

        let pid = child.id();
        let stdout = child.stdout.take().map(|s| Box::pin(s) as OutputStream);
        let stderr = child.stderr.take().map(|s| Box::pin(s) as OutputStream);
        tracing::debug!(program = %spec.program, ?pid, "process spawned");

        Ok(SpawnedProcess { pid, stdout, stderr, control: Box::new(LocalProcess { child }) })
    }
}

struct LocalProcess {
    child: Child,
}

#[async_trait]
impl ProcessControl for LocalProcess {
    async fn wait(&mut self) -> Result<ExitOutcome, ProcessError> {
        let status = self.child.wait().await.map_err(ProcessError::Wait)?;
        Ok(ExitOutcome { code: status.code() })
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        // Already reaped: nothing to kill
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        self.child.kill().await.map_err(ProcessError::Kill)
    }
}
