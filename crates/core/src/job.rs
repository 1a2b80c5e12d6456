// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automation job data: options, status, loop history and snapshots.

use crate::agent_record::AgentId;
use crate::severity::{Severity, Strategy};
use crate::violation::ViolationType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Identity of one automation job (registry key).
    pub struct JobId("job-");
}

crate::define_id! {
    /// Automation run id stamped on agent metadata and fix history.
    pub struct RunId("run-");
}

/// Job lifecycle: `pending → queued → running → {completed|failed|cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    /// Waiting for an admission slot
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Status reported by the re-scan collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanStatus::Running)
    }
}

crate::simple_display! {
    ScanStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescanOutcome {
    pub violation_type: ViolationType,
    pub status: ScanStatus,
    pub summary: String,
    /// Queue length after the reload
    pub reloaded: usize,
}

/// Audit entry appended once per loop iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRecord {
    pub loop_number: u32,
    pub started_at_ms: u64,
    pub security_dispatched: usize,
    pub standards_dispatched: usize,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    pub rescan_triggered: bool,
    #[serde(default)]
    pub rescan_results: Vec<RescanOutcome>,
    pub duration_ms: u64,
    pub message: String,
}

impl LoopRecord {
    pub fn dispatched(&self) -> usize {
        self.security_dispatched + self.standards_dispatched
    }
}

/// Caller-supplied configuration for one automation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationOptions {
    pub target: String,
    pub violation_types: Vec<ViolationType>,
    /// Empty means every severity
    pub severities: Vec<Severity>,
    pub strategy: Strategy,
    pub loop_delay: Duration,
    /// Overall deadline measured from job creation
    pub timeout: Option<Duration>,
    /// 0 means uncapped
    pub max_fixes: usize,
    pub model: Option<String>,
}

impl AutomationOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            violation_types: ViolationType::ALL.to_vec(),
            severities: Vec::new(),
            strategy: Strategy::default(),
            loop_delay: Duration::ZERO,
            timeout: None,
            max_fixes: 0,
            model: None,
        }
    }

    crate::setters! {
        set {
            violation_types: Vec<ViolationType>,
            severities: Vec<Severity>,
            strategy: Strategy,
            loop_delay: Duration,
            max_fixes: usize,
        }
        option {
            timeout: Duration,
            model: String,
        }
    }

    /// Enabled types with duplicates removed, in canonical order.
    pub fn enabled_types(&self) -> Vec<ViolationType> {
        ViolationType::ALL.into_iter().filter(|t| self.violation_types.contains(t)).collect()
    }
}

/// Point-in-time copy of a job, safe to hand to any reporting surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub run_id: RunId,
    pub target: String,
    pub status: JobStatus,
    pub strategy: Strategy,
    pub violation_types: Vec<ViolationType>,
    pub severities: Vec<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub loop_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub max_fixes: usize,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    pub loop_count: u32,
    pub attempted: usize,
    pub security_remaining: usize,
    pub standards_remaining: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub loops: Vec<LoopRecord>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
