// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use af_adapters::{AdapterError, ProcessError};
use af_core::{AgentId, ScanStatus, ViolationType};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the agent manager
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("task description must not be empty")]
    EmptyPrompt,
    #[error("agent not found: {0}")]
    NotFound(AgentId),
    #[error("failed to create agent log {}: {source}", path.display())]
    Log { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Spawn(#[from] ProcessError),
}

/// Errors from automation jobs and the runner
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("target must not be empty")]
    EmptyTarget,
    #[error("automation already running for {target}")]
    AlreadyRunning { target: String },
    #[error("no violation types enabled")]
    NoViolationTypes,
    #[error("no matching violations for {target}")]
    NoViolations { target: String },
    #[error("automation job not found: {0}")]
    NotFound(String),
    #[error("failed to load violations: {0}")]
    Provider(#[source] AdapterError),
    #[error("batch planning failed: {0}")]
    Planner(#[source] AdapterError),
    #[error("failed to launch agent: {0}")]
    Agent(#[from] AgentError),
    #[error("agent {agent_id} failed: {message}")]
    AgentFailed { agent_id: AgentId, message: String },
    #[error("{violation_type} re-scan error: {source}")]
    Scan { violation_type: ViolationType, source: AdapterError },
    #[error("{violation_type} re-scan {status}: {summary}")]
    ScanFailed { violation_type: ViolationType, status: ScanStatus, summary: String },
    #[error("automation deadline exceeded")]
    DeadlineExceeded,
    #[error("admission pool closed")]
    AdmissionClosed,
}
