// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation agent process lifecycle.
//!
//! Per started agent:
//!
//! ```text
//! stdout reader ─┐
//!                ├─ mpsc ─→ log writer ─→ <log_dir>/agent/<id>.log
//! stderr reader ─┘
//! await task: wait | cancel | timeout ─→ drain log ─→ classify ─→ history
//! ```
//!
//! An [`AgentRecord`] lives in exactly one of the active set or the bounded
//! history; the move happens under a single lock. The final record is also
//! published on the agent's [`AgentWatch`], which outlives history eviction.

use crate::agent_logger::{self, AgentLogger};
use crate::classify::classify_failure;
use crate::error::AgentError;
use af_adapters::{
    expand_args, ExitOutcome, FixHistorySink, OutputStream, ProcessControl, ProcessSpawner,
    ProcessSpec,
};
use af_core::{AgentId, AgentRecord, AgentSettings, AgentStatus, Clock, ViolationType};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long the log writer may keep draining after the process is gone.
///
/// Grandchildren can hold the output pipes open past a kill.
const LOG_DRAIN_GRACE: Duration = Duration::from_secs(2);

const LOG_CHANNEL_CAPACITY: usize = 256;

/// Manager construction parameters
#[derive(Debug, Clone)]
pub struct AgentManagerConfig {
    pub settings: AgentSettings,
    /// Agent logs go under `<log_dir>/agent/`
    pub log_dir: PathBuf,
}

/// One agent to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    pub action: String,
    pub target: String,
    pub violation_type: Option<ViolationType>,
    pub issue_ids: Vec<String>,
    /// Task description handed to the agent
    pub prompt: String,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub timeout: Option<Duration>,
    pub metadata: BTreeMap<String, String>,
}

impl AgentConfig {
    pub fn new(target: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: "agent".to_string(),
            action: "fix_violations".to_string(),
            target: target.into(),
            violation_type: None,
            issue_ids: Vec::new(),
            prompt: prompt.into(),
            model: None,
            max_turns: None,
            timeout: None,
            metadata: BTreeMap::new(),
        }
    }

    af_core::setters! {
        into {
            name: String,
            action: String,
        }
        set {
            issue_ids: Vec<String>,
            metadata: BTreeMap<String, String>,
        }
        option {
            violation_type: ViolationType,
            model: String,
            max_turns: u32,
            timeout: Duration,
        }
    }
}

/// Prefix a bare `provider/model` id with `namespace`.
///
/// Ids that already carry a namespace (two or more `/`) or none at all pass
/// through unchanged.
pub fn normalize_model(model: &str, namespace: &str) -> String {
    let model = model.trim();
    if namespace.is_empty() || model.matches('/').count() != 1 {
        return model.to_string();
    }
    format!("{namespace}/{model}")
}

/// Turn and time budgets scaled by batch size, each capped.
pub fn scaled_limits(settings: &AgentSettings, issues: usize) -> (u32, Duration) {
    let issues_u32 = u32::try_from(issues).unwrap_or(u32::MAX);
    let turns = settings
        .base_turns
        .saturating_add(settings.turns_per_issue.saturating_mul(issues_u32))
        .min(settings.max_turns_cap);
    let secs = settings
        .base_timeout_secs
        .saturating_add(settings.timeout_per_issue_secs.saturating_mul(issues as u64))
        .min(settings.max_timeout_secs);
    (turns, Duration::from_secs(secs))
}

struct ActiveAgent {
    record: AgentRecord,
    cancel: CancellationToken,
    done: watch::Sender<Option<AgentRecord>>,
}

/// What an [`AgentWatch`] currently knows about its agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Running,
    Finished(AgentRecord),
    /// Dropped by the manager without a final record
    Lost,
}

/// Handle on one agent's final record, independent of the bounded history.
#[derive(Debug, Clone)]
pub struct AgentWatch {
    id: AgentId,
    rx: watch::Receiver<Option<AgentRecord>>,
}

impl AgentWatch {
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn outcome(&self) -> AgentOutcome {
        if let Some(record) = self.rx.borrow().as_ref() {
            return AgentOutcome::Finished(record.clone());
        }
        if self.rx.has_changed().is_ok() {
            return AgentOutcome::Running;
        }
        // Sender gone: a final record may have landed just before the drop
        match self.rx.borrow().as_ref() {
            Some(record) => AgentOutcome::Finished(record.clone()),
            None => AgentOutcome::Lost,
        }
    }
}

#[derive(Default)]
struct AgentState {
    active: HashMap<AgentId, ActiveAgent>,
    /// Oldest first
    history: VecDeque<AgentRecord>,
}

struct Inner<C: Clock> {
    config: AgentManagerConfig,
    logger: AgentLogger,
    spawner: Arc<dyn ProcessSpawner>,
    history_sink: Arc<dyn FixHistorySink>,
    clock: C,
    state: Mutex<AgentState>,
}

/// Starts, tracks and stops remediation agents.
pub struct AgentManager<C: Clock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for AgentManager<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// How the await task saw the process end
enum Ending {
    Exited(ExitOutcome),
    Stopped,
    TimedOut(Duration),
    WaitFailed(String),
}

impl<C: Clock> AgentManager<C> {
    pub fn new(
        config: AgentManagerConfig,
        spawner: Arc<dyn ProcessSpawner>,
        history_sink: Arc<dyn FixHistorySink>,
        clock: C,
    ) -> Self {
        let logger = AgentLogger::new(config.log_dir.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                logger,
                spawner,
                history_sink,
                clock,
                state: Mutex::new(AgentState::default()),
            }),
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.inner.config.settings
    }

    /// Spawn one agent process and return its `running` record.
    pub async fn start_agent(&self, config: AgentConfig) -> Result<AgentRecord, AgentError> {
        self.start_agent_watched(config).await.map(|(record, _)| record)
    }

    /// [`start_agent`](Self::start_agent), plus a watch on the final record.
    pub async fn start_agent_watched(
        &self,
        config: AgentConfig,
    ) -> Result<(AgentRecord, AgentWatch), AgentError> {
        if config.prompt.trim().is_empty() {
            return Err(AgentError::EmptyPrompt);
        }
        let settings = &self.inner.config.settings;
        let id = AgentId::new();
        let requested = config.model.as_deref().filter(|m| !m.trim().is_empty());
        let model = normalize_model(
            requested.unwrap_or(settings.default_model.as_str()),
            &settings.model_namespace,
        );
        let (scaled_turns, scaled_timeout) = scaled_limits(settings, config.issue_ids.len());
        let max_turns = config.max_turns.unwrap_or(scaled_turns);
        let timeout = config.timeout.unwrap_or(scaled_timeout);

        let started_at_ms = self.inner.clock.epoch_ms();
        let header = format!(
            "agent {id} ({}) target={} model={model} issues={} started {}",
            config.name,
            config.target,
            config.issue_ids.len(),
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
        let log_path = self
            .inner
            .logger
            .create(&id, &header)
            .map_err(|source| AgentError::Log { path: self.agent_log_path(&id), source })?;

        let max_turns_text = max_turns.to_string();
        let vars = [
            ("model", model.as_str()),
            ("prompt", config.prompt.as_str()),
            ("max_turns", max_turns_text.as_str()),
            ("agent_id", id.as_str()),
            ("target", config.target.as_str()),
        ];
        let env = vec![
            ("AUTOFIX_AGENT_ID".to_string(), id.to_string()),
            ("AUTOFIX_TARGET".to_string(), config.target.clone()),
            ("AUTOFIX_MODEL".to_string(), model.clone()),
            ("AUTOFIX_MAX_TURNS".to_string(), max_turns_text.clone()),
            ("AUTOFIX_ISSUE_IDS".to_string(), config.issue_ids.join(",")),
            ("AUTOFIX_LOG_PATH".to_string(), log_path.display().to_string()),
        ];
        let mut spec = ProcessSpec::new(settings.program.clone())
            .args(expand_args(&settings.args, &vars))
            .env(env);
        if let Some(ref dir) = settings.working_dir {
            spec = spec.cwd(dir.clone());
        }

        let spawned = match self.inner.spawner.spawn(spec).await {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::error!(agent_id = %id, error = %e, "agent spawn failed");
                return Err(e.into());
            }
        };

        let record = AgentRecord {
            id: id.clone(),
            name: config.name,
            action: config.action,
            target: config.target,
            violation_type: config.violation_type,
            issue_ids: config.issue_ids,
            model,
            status: AgentStatus::Running,
            started_at_ms,
            ended_at_ms: None,
            duration_ms: 0,
            pid: spawned.pid,
            log_path: log_path.clone(),
            metadata: config.metadata,
            exit_code: None,
            error: None,
        };

        let cancel = CancellationToken::new();
        let (done, rx) = watch::channel(None);
        let watch = AgentWatch { id: id.clone(), rx };
        self.inner.state.lock().active.insert(
            id.clone(),
            ActiveAgent { record: record.clone(), cancel: cancel.clone(), done },
        );

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let readers = [spawned.stdout, spawned.stderr]
            .into_iter()
            .flatten()
            .map(|stream| spawn_reader(stream, tx.clone()))
            .collect::<Vec<_>>();
        drop(tx);
        let writer = AgentLogger::spawn_writer(log_path, rx);

        tracing::info!(
            agent_id = %id,
            target = %record.target,
            model = %record.model,
            issues = record.issue_ids.len(),
            max_turns,
            timeout_secs = timeout.as_secs(),
            pid = ?record.pid,
            "agent started"
        );

        let manager = self.clone();
        tokio::spawn(async move {
            let ending = await_exit(spawned.control, &cancel, timeout).await;
            drain_log(writer, readers).await;
            manager.finish(&id, ending);
        });

        Ok((record, watch))
    }

    /// Classify the ending and move the record into history.
    fn finish(&self, id: &AgentId, ending: Ending) {
        let now = self.inner.clock.epoch_ms();
        let settings = &self.inner.config.settings;

        let (log_path, model) = {
            let state = self.inner.state.lock();
            match state.active.get(id) {
                Some(agent) => (agent.record.log_path.clone(), agent.record.model.clone()),
                None => return,
            }
        };

        let (status, exit_code, process_error) = match ending {
            Ending::Exited(exit) if exit.success() => (AgentStatus::Completed, exit.code, None),
            Ending::Exited(exit) => (AgentStatus::Failed, exit.code, Some(exit.describe())),
            Ending::Stopped => (AgentStatus::Stopped, None, None),
            Ending::TimedOut(limit) => (
                AgentStatus::Failed,
                None,
                Some(format!("timed out after {}s", limit.as_secs())),
            ),
            Ending::WaitFailed(e) => (AgentStatus::Failed, None, Some(e)),
        };
        let error = process_error.map(|process_error| {
            let tail = agent_logger::read_tail(&log_path, settings.log_tail_lines);
            classify_failure(&tail, &model, &process_error)
        });

        let record = {
            let mut state = self.inner.state.lock();
            let Some(agent) = state.active.remove(id) else {
                return;
            };
            let mut record = agent.record;
            record.status = status;
            record.ended_at_ms = Some(now);
            record.duration_ms = now.saturating_sub(record.started_at_ms);
            record.exit_code = exit_code;
            record.error = error;
            agent.done.send_replace(Some(record.clone()));
            state.history.push_back(record.clone());
            // The record just inserted always survives eviction
            while state.history.len() > settings.history_cap.max(1) {
                state.history.pop_front();
            }
            record
        };

        match record.error {
            Some(ref error) => {
                tracing::warn!(agent_id = %id, status = %record.status, %error, "agent failed")
            }
            None => tracing::info!(
                agent_id = %id,
                status = %record.status,
                duration_ms = record.duration_ms,
                "agent finished"
            ),
        }
        self.inner.history_sink.record_completion(id, record.status == AgentStatus::Completed);
    }

    /// Request a stop. The process is killed asynchronously and the record
    /// ends `stopped`. Already-finished agents are returned unchanged.
    pub fn stop_agent(&self, id: &AgentId) -> Result<AgentRecord, AgentError> {
        let mut state = self.inner.state.lock();
        if let Some(agent) = state.active.get_mut(id) {
            if agent.record.status == AgentStatus::Running {
                agent.record.status = AgentStatus::Stopping;
                tracing::info!(agent_id = %id, "stopping agent");
            }
            agent.cancel.cancel();
            return Ok(agent.record.clone());
        }
        state
            .history
            .iter()
            .rev()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(id.clone()))
    }

    pub fn get_agent(&self, id: &AgentId) -> Option<AgentRecord> {
        let now = self.inner.clock.epoch_ms();
        let state = self.inner.state.lock();
        if let Some(agent) = state.active.get(id) {
            return Some(agent.record.with_live_duration(now));
        }
        state.history.iter().rev().find(|r| &r.id == id).cloned()
    }

    /// Active agents, oldest first.
    pub fn list_agents(&self) -> Vec<AgentRecord> {
        let now = self.inner.clock.epoch_ms();
        let state = self.inner.state.lock();
        let mut agents: Vec<AgentRecord> =
            state.active.values().map(|a| a.record.with_live_duration(now)).collect();
        agents.sort_by(|a, b| a.started_at_ms.cmp(&b.started_at_ms).then_with(|| a.id.cmp(&b.id)));
        agents
    }

    /// Finished agents, most recent first.
    pub fn agent_history(&self) -> Vec<AgentRecord> {
        self.inner.state.lock().history.iter().rev().cloned().collect()
    }

    pub fn agent_log_path(&self, id: &AgentId) -> PathBuf {
        self.inner.logger.log_path(id)
    }

    pub fn is_active(&self, id: &AgentId) -> bool {
        self.inner.state.lock().active.contains_key(id)
    }
}

fn spawn_reader(stream: OutputStream, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "agent output stream closed");
                    break;
                }
            }
        }
    })
}

async fn await_exit(
    mut control: Box<dyn ProcessControl>,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Ending {
    let ending = tokio::select! {
        result = control.wait() => match result {
            Ok(exit) => return Ending::Exited(exit),
            Err(e) => return Ending::WaitFailed(e.to_string()),
        },
        _ = cancel.cancelled() => Ending::Stopped,
        _ = tokio::time::sleep(timeout) => Ending::TimedOut(timeout),
    };
    if let Err(e) = control.kill().await {
        tracing::warn!(error = %e, "failed to kill agent process");
    }
    if let Err(e) = control.wait().await {
        tracing::debug!(error = %e, "failed to reap agent process");
    }
    ending
}

async fn drain_log(mut writer: JoinHandle<()>, readers: Vec<JoinHandle<()>>) {
    if tokio::time::timeout(LOG_DRAIN_GRACE, &mut writer).await.is_err() {
        for reader in &readers {
            reader.abort();
        }
        let _ = writer.await;
    }
}

#[cfg(test)]
#[path = "agent_manager_tests.rs"]
mod tests;
