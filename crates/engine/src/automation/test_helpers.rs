// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake-backed automation environment shared by job and runner tests.

use super::{AutomationDeps, AutomationJob, AutomationRunner};
use crate::agent_manager::{AgentManager, AgentManagerConfig};
use af_adapters::{
    ChunkPlanner, FakeHistorySink, FakeScanTrigger, FakeSpawner, FakeViolationProvider,
};
use af_core::test_support::violations;
use af_core::{
    AgentSettings, AutomationSettings, FakeClock, JobSnapshot, Violation, ViolationType,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestEnv {
    pub deps: AutomationDeps<FakeClock>,
    pub violations: FakeViolationProvider,
    pub scans: FakeScanTrigger,
    pub spawner: FakeSpawner,
    pub history: FakeHistorySink,
    pub settings: AutomationSettings,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: AutomationSettings) -> Self {
        Self::with_agent_settings(settings, AgentSettings::default())
    }

    pub fn with_agent_settings(settings: AutomationSettings, agent: AgentSettings) -> Self {
        let dir = TempDir::new().unwrap();
        let violations = FakeViolationProvider::new();
        let scans = FakeScanTrigger::new();
        let spawner = FakeSpawner::new();
        let history = FakeHistorySink::new();
        let clock = FakeClock::new();
        let agents = AgentManager::new(
            AgentManagerConfig { settings: agent, log_dir: dir.path().to_path_buf() },
            Arc::new(spawner.clone()),
            Arc::new(history.clone()),
            clock.clone(),
        );
        let deps = AutomationDeps {
            agents,
            violations: Arc::new(violations.clone()),
            scans: Arc::new(scans.clone()),
            planner: Arc::new(ChunkPlanner::default()),
            history: Arc::new(history.clone()),
            clock,
        };
        Self { deps, violations, scans, spawner, history, settings, _dir: dir }
    }

    pub fn runner(&self) -> AutomationRunner<FakeClock> {
        AutomationRunner::new(self.deps.clone(), self.settings.clone())
    }

    /// Queue a provider answer of `(id, severity)` pairs.
    pub fn push(&self, violation_type: ViolationType, pairs: &[(&str, &str)]) {
        self.violations.push(violation_type, violations(pairs));
    }

    pub fn push_many(&self, violation_type: ViolationType, prefix: &str, count: usize) {
        let list: Vec<Violation> =
            (1..=count).map(|i| Violation::new(format!("{prefix}{i}"), "medium")).collect();
        self.violations.push(violation_type, list);
    }
}

pub fn test_settings() -> AutomationSettings {
    AutomationSettings {
        agent_poll_interval_ms: 10,
        scan_poll_interval_ms: 10,
        ..AutomationSettings::default()
    }
}

/// Wait (in tokio time) until the job is terminal.
pub async fn finished(job: &AutomationJob<FakeClock>) -> JobSnapshot {
    tokio::time::timeout(Duration::from_secs(3_600), job.finished())
        .await
        .expect("job did not finish");
    job.snapshot()
}

/// Poll `condition` every millisecond of tokio time.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..100_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never became true");
}
