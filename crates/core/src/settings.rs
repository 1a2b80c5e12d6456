// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunables for the orchestrator, deserialized from the `[automation]` and
//! `[agent]` config sections. Every field has a default.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    /// Admission slots shared by all jobs
    pub max_concurrent_jobs: usize,
    /// Upper bound on ids pulled from one queue per iteration
    pub per_loop_cap: usize,
    /// Max issues handed to a single agent process
    pub agent_capacity: usize,
    pub agent_poll_interval_ms: u64,
    pub scan_poll_interval_ms: u64,
    /// Snapshots of finished jobs kept queryable
    pub finished_history: usize,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            per_loop_cap: 200,
            agent_capacity: 10,
            agent_poll_interval_ms: 2_000,
            scan_poll_interval_ms: 2_000,
            finished_history: 50,
        }
    }
}

impl AutomationSettings {
    pub fn agent_poll_interval(&self) -> Duration {
        Duration::from_millis(self.agent_poll_interval_ms.max(1))
    }

    pub fn scan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Remediation executable
    pub program: String,
    /// Argument template; `{model}`, `{prompt}`, `{max_turns}`, `{agent_id}`
    /// and `{target}` are substituted per agent
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub default_model: String,
    /// Prefix added to bare `provider/model` ids
    pub model_namespace: String,
    pub base_turns: u32,
    pub turns_per_issue: u32,
    pub max_turns_cap: u32,
    pub base_timeout_secs: u64,
    pub timeout_per_issue_secs: u64,
    pub max_timeout_secs: u64,
    /// Finished agent records retained
    pub history_cap: usize,
    /// Log lines inspected when classifying a failure
    pub log_tail_lines: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            program: "opencode".to_string(),
            args: ["run", "--model", "{model}", "{prompt}"].map(String::from).to_vec(),
            working_dir: None,
            default_model: "openrouter/x-ai/grok-code-fast-1".to_string(),
            model_namespace: "openrouter".to_string(),
            base_turns: 30,
            turns_per_issue: 5,
            max_turns_cap: 200,
            base_timeout_secs: 600,
            timeout_per_issue_secs: 120,
            max_timeout_secs: 3_600,
            history_cap: 100,
            log_tail_lines: 200,
        }
    }
}
