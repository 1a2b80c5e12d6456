// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation agent records.
//!
//! One record per external remediation process. A record lives in the agent
//! manager's active set while the process runs and moves to the bounded
//! history when it exits.

use crate::violation::ViolationType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a remediation agent process.
    pub struct AgentId("agt-");
}

/// Lifecycle of a remediation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Running,
    /// Stop requested, kill in flight
    Stopping,
    /// Killed on request
    Stopped,
    Completed,
    Failed,
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Stopped | AgentStatus::Completed | AgentStatus::Failed)
    }
}

crate::simple_display! {
    AgentStatus {
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Completed => "completed",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    /// Human label, e.g. `fix-standards-critical`
    pub name: String,
    /// What the agent does (`fix_violations`)
    pub action: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<ViolationType>,
    pub issue_ids: Vec<String>,
    pub model: String,
    pub status: AgentStatus,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    /// Final for terminal records, live for running ones
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub log_path: PathBuf,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Copy with `duration_ms` computed against `now_ms` when still running.
    pub fn with_live_duration(&self, now_ms: u64) -> AgentRecord {
        let mut copy = self.clone();
        if copy.ended_at_ms.is_none() {
            copy.duration_ms = now_ms.saturating_sub(copy.started_at_ms);
        }
        copy
    }
}

#[cfg(test)]
#[path = "agent_record_tests.rs"]
mod tests;
