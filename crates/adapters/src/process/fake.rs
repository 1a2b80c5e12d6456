// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory processes for tests.

use super::{
    ExitOutcome, OutputStream, ProcessControl, ProcessError, ProcessSpawner, ProcessSpec,
    SpawnedProcess,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Output and exit behavior of one fake process.
#[derive(Debug, Clone)]
pub struct FakeScript {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
    /// Time between spawn and exit
    pub run_for: Duration,
    /// Never exits on its own; only a kill ends it
    pub hang: bool,
}

impl Default for FakeScript {
    fn default() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
            run_for: Duration::from_millis(10),
            hang: false,
        }
    }
}

impl FakeScript {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn exit(code: i32) -> Self {
        Self { exit_code: code, ..Self::default() }
    }

    pub fn hang() -> Self {
        Self { hang: true, ..Self::default() }
    }

    pub fn stdout(mut self, lines: &[&str]) -> Self {
        self.stdout = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn stderr(mut self, lines: &[&str]) -> Self {
        self.stderr = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn run_for(mut self, run_for: Duration) -> Self {
        self.run_for = run_for;
        self
    }
}

struct FakeSpawnerState {
    default_script: FakeScript,
    scripted: VecDeque<FakeScript>,
    calls: Vec<ProcessSpec>,
    kills: usize,
    running: usize,
    max_running: usize,
    /// Spawns fail once `calls` reaches the limit
    spawn_error: Option<(usize, String)>,
}

/// Fake spawner: each spawn consumes the next queued script, falling back to
/// the default script.
#[derive(Clone)]
pub struct FakeSpawner {
    inner: Arc<Mutex<FakeSpawnerState>>,
}

impl Default for FakeSpawner {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSpawnerState {
                default_script: FakeScript::default(),
                scripted: VecDeque::new(),
                calls: Vec::new(),
                kills: 0,
                running: 0,
                max_running: 0,
                spawn_error: None,
            })),
        }
    }
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default(&self, script: FakeScript) {
        self.inner.lock().default_script = script;
    }

    /// Queue a script for the next spawn.
    pub fn push(&self, script: FakeScript) {
        self.inner.lock().scripted.push_back(script);
    }

    /// Make every following spawn fail.
    pub fn fail_spawns(&self, message: &str) {
        self.fail_spawns_after(0, message);
    }

    /// Let `successes` more spawns through, then fail the rest.
    pub fn fail_spawns_after(&self, successes: usize, message: &str) {
        let mut state = self.inner.lock();
        let limit = state.calls.len() + successes;
        state.spawn_error = Some((limit, message.to_string()));
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.inner.lock().calls.clone()
    }

    pub fn kills(&self) -> usize {
        self.inner.lock().kills
    }

    pub fn running(&self) -> usize {
        self.inner.lock().running
    }

    /// Highest number of simultaneously running fake processes
    pub fn max_running(&self) -> usize {
        self.inner.lock().max_running
    }
}

fn stream(lines: &[String]) -> OutputStream {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
    }
    Box::pin(Cursor::new(bytes))
}

#[async_trait]
impl ProcessSpawner for FakeSpawner {
    async fn spawn(&self, spec: ProcessSpec) -> Result<SpawnedProcess, ProcessError> {
        let script = {
            let mut state = self.inner.lock();
            if let Some((limit, ref message)) = state.spawn_error {
                if state.calls.len() >= limit {
                    return Err(ProcessError::Rejected(message.clone()));
                }
            }
            state.calls.push(spec);
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            let default = state.default_script.clone();
            state.scripted.pop_front().unwrap_or(default)
        };

        let pid = Some(10_000 + self.calls().len() as u32);
        Ok(SpawnedProcess {
            pid,
            stdout: Some(stream(&script.stdout)),
            stderr: Some(stream(&script.stderr)),
            control: Box::new(FakeProcess {
                script,
                killed: false,
                exited: false,
                kill_signal: Arc::new(Notify::new()),
                spawner: Arc::clone(&self.inner),
            }),
        })
    }
}

struct FakeProcess {
    script: FakeScript,
    killed: bool,
    exited: bool,
    kill_signal: Arc<Notify>,
    spawner: Arc<Mutex<FakeSpawnerState>>,
}

impl FakeProcess {
    fn finish(&mut self, outcome: ExitOutcome) -> ExitOutcome {
        if !self.exited {
            self.exited = true;
            let mut state = self.spawner.lock();
            state.running = state.running.saturating_sub(1);
        }
        outcome
    }
}

#[async_trait]
impl ProcessControl for FakeProcess {
    async fn wait(&mut self) -> Result<ExitOutcome, ProcessError> {
        if self.killed {
            return Ok(self.finish(ExitOutcome::signaled()));
        }
        let signal = Arc::clone(&self.kill_signal);
        if self.script.hang {
            signal.notified().await;
            return Ok(self.finish(ExitOutcome::signaled()));
        }
        tokio::select! {
            _ = tokio::time::sleep(self.script.run_for) => {
                let code = self.script.exit_code;
                Ok(self.finish(ExitOutcome::code(code)))
            }
            _ = signal.notified() => Ok(self.finish(ExitOutcome::signaled())),
        }
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        if self.exited {
            return Ok(());
        }
        self.killed = true;
        self.kill_signal.notify_one();
        self.spawner.lock().kills += 1;
        Ok(())
    }
}
