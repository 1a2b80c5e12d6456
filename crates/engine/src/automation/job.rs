// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target automation job and its control loop.
//!
//! ```text
//! pending ─→ queued ─(slot)─→ running ─→ completed | failed | cancelled
//!               │
//!               ├─ stop     → cancelled ("stopped before admission")
//!               ├─ cancel   → cancelled
//!               └─ deadline → failed
//! ```
//!
//! Each loop iteration drains up to `per_loop_cap` ids per enabled type,
//! launches agents for them, waits for every agent to finish, and re-scans
//! once the queues run dry.

use super::AutomationDeps;
use crate::agent_manager::{AgentConfig, AgentOutcome, AgentWatch};
use crate::error::AutomationError;
use crate::signal::StopSignal;
use af_adapters::{AdapterError, FixStart, PromptRequest, ScanHandle, ScanPoll};
use af_core::{
    highest_severity, sort_violations, AgentId, AgentStatus, AutomationOptions,
    AutomationSettings, Clock, IssueQueue, JobId, JobSnapshot, JobStatus, LoopRecord,
    RescanOutcome, RunId, ScanStatus, Severity, ViolationType,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a suspension point ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Stopped,
    Deadline,
}

enum StepError {
    Interrupted(Interrupt),
    Failed(AutomationError),
}

impl From<AutomationError> for StepError {
    fn from(e: AutomationError) -> Self {
        StepError::Failed(e)
    }
}

impl From<Interrupt> for StepError {
    fn from(i: Interrupt) -> Self {
        StepError::Interrupted(i)
    }
}

/// Terminal status, human message, error text
type Outcome = (JobStatus, String, Option<String>);

/// Agents started during one loop
#[derive(Default)]
struct Launched {
    watches: Vec<AgentWatch>,
    /// Issues handed to the started agents
    issues: usize,
}

impl Launched {
    fn agent_ids(&self) -> Vec<AgentId> {
        self.watches.iter().map(|w| w.id().clone()).collect()
    }
}

/// One violation type's queue plus the severity of every id in it
#[derive(Debug, Default)]
struct TypeQueue {
    queue: IssueQueue,
    severities: HashMap<String, String>,
}

struct JobState {
    status: JobStatus,
    created_at_ms: u64,
    started_at_ms: Option<u64>,
    completed_at_ms: Option<u64>,
    loop_count: u32,
    attempted: usize,
    message: String,
    error: Option<String>,
    loops: Vec<LoopRecord>,
    security: TypeQueue,
    standards: TypeQueue,
}

impl JobState {
    fn queue(&self, violation_type: ViolationType) -> &TypeQueue {
        match violation_type {
            ViolationType::Security => &self.security,
            ViolationType::Standards => &self.standards,
        }
    }

    fn queue_mut(&mut self, violation_type: ViolationType) -> &mut TypeQueue {
        match violation_type {
            ViolationType::Security => &mut self.security,
            ViolationType::Standards => &mut self.standards,
        }
    }
}

pub struct AutomationJob<C: Clock> {
    id: JobId,
    run_id: RunId,
    options: AutomationOptions,
    enabled: Vec<ViolationType>,
    deps: AutomationDeps<C>,
    settings: AutomationSettings,
    deadline: Option<Instant>,
    stop: StopSignal,
    cancel: CancellationToken,
    done: CancellationToken,
    state: RwLock<JobState>,
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<C: Clock> AutomationJob<C> {
    /// Validate options and load both queues.
    pub async fn create(
        mut options: AutomationOptions,
        deps: AutomationDeps<C>,
        settings: AutomationSettings,
    ) -> Result<Arc<Self>, AutomationError> {
        let target = options.target.trim().to_string();
        if target.is_empty() {
            return Err(AutomationError::EmptyTarget);
        }
        let enabled = options.enabled_types();
        if enabled.is_empty() {
            return Err(AutomationError::NoViolationTypes);
        }

        let mut security = TypeQueue::default();
        let mut standards = TypeQueue::default();
        for &violation_type in &enabled {
            let loaded = load_queue(&deps, &target, violation_type, &options)
                .await
                .map_err(AutomationError::Provider)?;
            match violation_type {
                ViolationType::Security => security = loaded,
                ViolationType::Standards => standards = loaded,
            }
        }
        if security.queue.is_empty() && standards.queue.is_empty() {
            return Err(AutomationError::NoViolations { target });
        }

        let id = JobId::new();
        tracing::info!(
            job_id = %id,
            %target,
            strategy = %options.strategy,
            security = security.queue.len(),
            standards = standards.queue.len(),
            "automation job created"
        );

        options.target = target;
        let state = JobState {
            status: JobStatus::Pending,
            created_at_ms: deps.clock.epoch_ms(),
            started_at_ms: None,
            completed_at_ms: None,
            loop_count: 0,
            attempted: 0,
            message: "created".to_string(),
            error: None,
            loops: Vec::new(),
            security,
            standards,
        };
        Ok(Arc::new(Self {
            id,
            run_id: RunId::new(),
            deadline: options.timeout.map(|timeout| Instant::now() + timeout),
            options,
            enabled,
            deps,
            settings,
            stop: StopSignal::new(),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
            state: RwLock::new(state),
        }))
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn target(&self) -> &str {
        &self.options.target
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    pub fn created_at_ms(&self) -> u64 {
        self.state.read().created_at_ms
    }

    /// Ask the job to finish after the current iteration. `true` for the
    /// first request on a live job.
    pub fn request_stop(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        let first = self.stop.request();
        if first {
            tracing::info!(job_id = %self.id, "stop after loop requested");
        }
        first
    }

    /// Hard cancel. No-op once terminal.
    pub fn cancel(&self) -> bool {
        if self.status().is_terminal() || self.cancel.is_cancelled() {
            return false;
        }
        tracing::info!(job_id = %self.id, "cancel requested");
        self.cancel.cancel();
        true
    }

    /// Resolves once the job reached a terminal status.
    pub async fn finished(&self) {
        self.done.cancelled().await
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read();
        JobSnapshot {
            id: self.id.clone(),
            run_id: self.run_id.clone(),
            target: self.options.target.clone(),
            status: state.status,
            strategy: self.options.strategy,
            violation_types: self.enabled.clone(),
            severities: self.options.severities.clone(),
            model: self.options.model.clone(),
            loop_delay_ms: self.options.loop_delay.as_millis() as u64,
            timeout_ms: self.options.timeout.map(|t| t.as_millis() as u64),
            max_fixes: self.options.max_fixes,
            created_at_ms: state.created_at_ms,
            started_at_ms: state.started_at_ms,
            completed_at_ms: state.completed_at_ms,
            loop_count: state.loop_count,
            attempted: state.attempted,
            security_remaining: state.security.queue.remaining(),
            standards_remaining: state.standards.queue.remaining(),
            message: state.message.clone(),
            error: state.error.clone(),
            loops: state.loops.clone(),
        }
    }

    /// Wait for admission, run the control loop, settle the final status.
    pub(crate) async fn run(&self, slots: Arc<Semaphore>) {
        {
            let mut state = self.state.write();
            state.status = JobStatus::Queued;
            state.message = "waiting for an admission slot".to_string();
        }

        let admitted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = self.stop.requested() => Err(Interrupt::Stopped),
            _ = deadline_reached(self.deadline) => Err(Interrupt::Deadline),
            permit = Arc::clone(&slots).acquire_owned() => Ok(permit),
        };
        let permit = match admitted {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                let error = AutomationError::AdmissionClosed.to_string();
                self.finish((JobStatus::Failed, error.clone(), Some(error)));
                return;
            }
            Err(Interrupt::Stopped) => {
                self.finish((JobStatus::Cancelled, "stopped before admission".to_string(), None));
                return;
            }
            Err(interrupt) => {
                self.finish(self.interrupt_outcome(interrupt));
                return;
            }
        };

        {
            let mut state = self.state.write();
            state.status = JobStatus::Running;
            state.started_at_ms = Some(self.deps.clock.epoch_ms());
            state.message = "running".to_string();
        }
        tracing::info!(job_id = %self.id, target = %self.options.target, "automation job admitted");

        let outcome = self.control_loop().await;
        drop(permit);
        self.finish(outcome);
    }

    fn finish(&self, (status, message, error): Outcome) {
        {
            let mut state = self.state.write();
            state.status = status;
            state.completed_at_ms = Some(self.deps.clock.epoch_ms());
            state.message = message.clone();
            state.error = error.clone();
        }
        match error {
            Some(error) => {
                tracing::warn!(job_id = %self.id, %status, %error, "automation job finished")
            }
            None => tracing::info!(job_id = %self.id, %status, %message, "automation job finished"),
        }
        self.done.cancel();
    }

    fn interrupt_outcome(&self, interrupt: Interrupt) -> Outcome {
        match interrupt {
            Interrupt::Stopped => {
                let loops = self.state.read().loop_count;
                let message = format!("stopped by operator request after {loops} loop(s)");
                (JobStatus::Completed, message, None)
            }
            Interrupt::Cancelled => {
                (JobStatus::Cancelled, "cancelled by operator".to_string(), None)
            }
            Interrupt::Deadline => {
                let error = AutomationError::DeadlineExceeded.to_string();
                (JobStatus::Failed, error.clone(), Some(error))
            }
        }
    }

    /// Stop request wins over cancel, cancel over deadline.
    fn pending_interrupt(&self) -> Option<Interrupt> {
        if self.stop.is_requested() {
            Some(Interrupt::Stopped)
        } else if self.cancel.is_cancelled() {
            Some(Interrupt::Cancelled)
        } else if self.deadline.is_some_and(|at| Instant::now() >= at) {
            Some(Interrupt::Deadline)
        } else {
            None
        }
    }

    async fn control_loop(&self) -> Outcome {
        loop {
            if let Some(interrupt) = self.pending_interrupt() {
                return self.interrupt_outcome(interrupt);
            }

            match self.iteration().await {
                Err(StepError::Interrupted(interrupt)) => return self.interrupt_outcome(interrupt),
                Err(StepError::Failed(e)) => {
                    let error = e.to_string();
                    return (JobStatus::Failed, error.clone(), Some(error));
                }
                Ok(has_remaining) => {
                    let max_fixes = self.options.max_fixes;
                    if max_fixes > 0 && self.state.read().attempted >= max_fixes {
                        let message = format!("maximum automated fixes reached ({max_fixes})");
                        return (JobStatus::Completed, message, None);
                    }
                    if !has_remaining {
                        return (JobStatus::Completed, "no remaining issues".to_string(), None);
                    }
                }
            }

            if !self.options.loop_delay.is_zero() {
                // An interrupted delay is settled at the top of the loop
                let _ = self.pause(self.options.loop_delay, true).await;
            }
        }
    }

    /// Sleep, cut short by cancel, deadline and (optionally) a stop request.
    async fn pause(&self, duration: Duration, include_stop: bool) -> Result<(), Interrupt> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = deadline_reached(self.deadline) => Err(Interrupt::Deadline),
            _ = self.stop.requested(), if include_stop => Err(Interrupt::Stopped),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn dispatch_order(&self) -> Vec<ViolationType> {
        self.options
            .strategy
            .dispatch_order()
            .into_iter()
            .filter(|t| self.enabled.contains(t))
            .collect()
    }

    /// One loop iteration. `Ok(true)` when work remains.
    async fn iteration(&self) -> Result<bool, StepError> {
        let started = Instant::now();
        let (loop_number, mut allowance) = {
            let mut state = self.state.write();
            state.loop_count += 1;
            let allowance = (self.options.max_fixes > 0)
                .then(|| self.options.max_fixes.saturating_sub(state.attempted));
            (state.loop_count, allowance)
        };
        let mut record = LoopRecord {
            loop_number,
            started_at_ms: self.deps.clock.epoch_ms(),
            security_dispatched: 0,
            standards_dispatched: 0,
            agent_ids: Vec::new(),
            rescan_triggered: false,
            rescan_results: Vec::new(),
            duration_ms: 0,
            message: String::new(),
        };
        tracing::debug!(job_id = %self.id, loop_number, ?allowance, "loop started");

        let mut taken = 0;
        let mut launched = Launched::default();
        for violation_type in self.dispatch_order() {
            if allowance == Some(0) {
                break;
            }
            let ids = self
                .state
                .write()
                .queue_mut(violation_type)
                .queue
                .next_batch(self.settings.per_loop_cap, allowance);
            if ids.is_empty() {
                continue;
            }
            if let Some(left) = allowance.as_mut() {
                *left = left.saturating_sub(ids.len());
            }
            match violation_type {
                ViolationType::Security => record.security_dispatched += ids.len(),
                ViolationType::Standards => record.standards_dispatched += ids.len(),
            }
            taken += ids.len();

            let result = self.launch_batch(loop_number, violation_type, &ids, &mut launched).await;
            record.agent_ids = launched.agent_ids();
            if let Err(e) = result {
                self.stop_agents(&record.agent_ids);
                self.state.write().attempted += launched.issues;
                record.message = format!("batch launch failed: {e}");
                self.append_loop(record, started);
                return Err(e.into());
            }
        }

        if !record.agent_ids.is_empty() {
            match self.await_agents(&launched.watches).await {
                Err(interrupt) => {
                    self.stop_agents(&record.agent_ids);
                    record.message = "interrupted while awaiting agents".to_string();
                    self.append_loop(record, started);
                    return Err(interrupt.into());
                }
                Ok(failed) => {
                    self.state.write().attempted += taken;
                    if let Some((agent_id, message)) = failed.first() {
                        let error = AutomationError::AgentFailed {
                            agent_id: agent_id.clone(),
                            message: message.clone(),
                        };
                        record.message = format!(
                            "{} of {} agent(s) failed",
                            failed.len(),
                            record.agent_ids.len()
                        );
                        self.append_loop(record, started);
                        return Err(error.into());
                    }
                }
            }
        }

        if taken == 0 || self.queues_empty() {
            record.rescan_triggered = true;
            if let Err(e) = self.rescan_and_reload(&mut record.rescan_results).await {
                record.message = match e {
                    StepError::Interrupted(_) => "interrupted during re-scan".to_string(),
                    StepError::Failed(ref err) => format!("re-scan failed: {err}"),
                };
                self.append_loop(record, started);
                return Err(e);
            }
        }

        let remaining = !self.queues_empty();
        record.message = if record.rescan_triggered {
            let reloaded: usize = record.rescan_results.iter().map(|r| r.reloaded).sum();
            format!(
                "dispatched {} issue(s) to {} agent(s); re-scan reloaded {reloaded} issue(s)",
                taken,
                record.agent_ids.len()
            )
        } else {
            format!("dispatched {} issue(s) to {} agent(s)", taken, record.agent_ids.len())
        };
        self.append_loop(record, started);
        Ok(remaining)
    }

    /// Split one type's batch into agent-sized groups and start an agent per
    /// group. Started agents are recorded as they launch.
    async fn launch_batch(
        &self,
        loop_number: u32,
        violation_type: ViolationType,
        ids: &[String],
        launched: &mut Launched,
    ) -> Result<(), AutomationError> {
        let target = self.options.target.as_str();
        let groups = self
            .deps
            .planner
            .group(target, violation_type, ids, self.settings.agent_capacity)
            .map_err(AutomationError::Planner)?;

        for group in groups {
            let severity = {
                let state = self.state.read();
                let labels = &state.queue(violation_type).severities;
                highest_severity(group.iter().filter_map(|id| labels.get(id)).map(String::as_str))
            };
            let prompt = self
                .deps
                .planner
                .render(&PromptRequest {
                    target: target.to_string(),
                    violation_type,
                    issue_ids: group.clone(),
                    severity,
                })
                .map_err(AutomationError::Planner)?;

            let metadata = BTreeMap::from([
                ("automation_run_id".to_string(), self.run_id.to_string()),
                ("loop".to_string(), loop_number.to_string()),
                ("strategy".to_string(), self.options.strategy.to_string()),
                ("violation_type".to_string(), violation_type.to_string()),
                ("issue_count".to_string(), group.len().to_string()),
            ]);
            let label = severity.map_or("unknown", Severity::as_str);
            let issue_count = group.len();
            let mut config = AgentConfig::new(target, prompt)
                .name(format!("fix-{violation_type}-{label}"))
                .violation_type(violation_type)
                .issue_ids(group)
                .metadata(metadata);
            if let Some(ref model) = self.options.model {
                config = config.model(model.clone());
            }

            let (agent, watch) = self.deps.agents.start_agent_watched(config).await?;
            self.deps.history.record_start(FixStart {
                target: target.to_string(),
                violation_type,
                severity,
                agent_id: agent.id.clone(),
                issue_count,
                run_id: self.run_id.clone(),
            });
            tracing::info!(
                job_id = %self.id,
                loop_number,
                agent_id = %agent.id,
                %violation_type,
                issue_count,
                "batch launched"
            );
            launched.issues += issue_count;
            launched.watches.push(watch);
        }
        Ok(())
    }

    /// Poll until every agent is terminal; returns `(agent, reason)` per failure.
    async fn await_agents(
        &self,
        watches: &[AgentWatch],
    ) -> Result<Vec<(AgentId, String)>, Interrupt> {
        loop {
            let mut pending = false;
            let mut failed = Vec::new();
            for watch in watches {
                match watch.outcome() {
                    AgentOutcome::Running => pending = true,
                    AgentOutcome::Finished(record) if record.status == AgentStatus::Failed => {
                        let reason = record.error.unwrap_or_else(|| record.status.to_string());
                        failed.push((record.id, reason));
                    }
                    AgentOutcome::Finished(_) => {}
                    AgentOutcome::Lost => {
                        failed.push((watch.id().clone(), "agent ended without a record".into()))
                    }
                }
            }
            if !pending {
                return Ok(failed);
            }
            self.pause(self.settings.agent_poll_interval(), false).await?;
        }
    }

    fn stop_agents(&self, ids: &[AgentId]) {
        for id in ids {
            if let Err(e) = self.deps.agents.stop_agent(id) {
                tracing::debug!(job_id = %self.id, agent_id = %id, error = %e, "stop skipped");
            }
        }
    }

    /// Re-scan every enabled type, then reload the queues.
    async fn rescan_and_reload(&self, results: &mut Vec<RescanOutcome>) -> Result<(), StepError> {
        let target = self.options.target.as_str();
        let mut handles = Vec::with_capacity(self.enabled.len());
        for &violation_type in &self.enabled {
            let handle = self
                .deps
                .scans
                .start_scan(target, violation_type)
                .await
                .map_err(|source| AutomationError::Scan { violation_type, source })?;
            handles.push(handle);
        }

        for handle in handles {
            let poll = self.poll_scan(&handle).await?;
            results.push(RescanOutcome {
                violation_type: handle.violation_type,
                status: poll.status,
                summary: poll.summary.clone(),
                reloaded: 0,
            });
            if poll.status != ScanStatus::Completed {
                return Err(AutomationError::ScanFailed {
                    violation_type: handle.violation_type,
                    status: poll.status,
                    summary: poll.summary,
                }
                .into());
            }
        }

        for &violation_type in &self.enabled {
            let loaded = load_queue(&self.deps, target, violation_type, &self.options)
                .await
                .map_err(AutomationError::Provider)?;
            let reloaded = loaded.queue.len();
            *self.state.write().queue_mut(violation_type) = loaded;
            if let Some(outcome) = results.iter_mut().find(|r| r.violation_type == violation_type) {
                outcome.reloaded = reloaded;
            }
            tracing::info!(job_id = %self.id, %violation_type, reloaded, "queue reloaded");
        }
        Ok(())
    }

    async fn poll_scan(&self, handle: &ScanHandle) -> Result<ScanPoll, StepError> {
        loop {
            let poll = self.deps.scans.poll_scan(handle).await.map_err(|source| {
                AutomationError::Scan { violation_type: handle.violation_type, source }
            })?;
            if poll.status.is_terminal() {
                return Ok(poll);
            }
            self.pause(self.settings.scan_poll_interval(), false).await?;
        }
    }

    fn queues_empty(&self) -> bool {
        let state = self.state.read();
        self.enabled.iter().all(|&t| state.queue(t).queue.is_empty())
    }

    fn append_loop(&self, mut record: LoopRecord, started: Instant) {
        record.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            job_id = %self.id,
            loop_number = record.loop_number,
            security = record.security_dispatched,
            standards = record.standards_dispatched,
            agents = record.agent_ids.len(),
            rescan = record.rescan_triggered,
            message = %record.message,
            "loop finished"
        );
        self.state.write().loops.push(record);
    }
}

/// Fetch, sort and index one violation type for `target`.
async fn load_queue<C: Clock>(
    deps: &AutomationDeps<C>,
    target: &str,
    violation_type: ViolationType,
    options: &AutomationOptions,
) -> Result<TypeQueue, AdapterError> {
    let mut violations =
        deps.violations.list_violations(target, violation_type, &options.severities).await?;
    sort_violations(&mut violations, options.strategy);
    let severities = violations.iter().map(|v| (v.id.clone(), v.severity.clone())).collect();
    Ok(TypeQueue { queue: IssueQueue::from_violations(&violations), severities })
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
