// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared with other crates' tests.

use crate::agent_record::{AgentId, AgentRecord, AgentStatus};
use crate::violation::Violation;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A minimal agent record with the given id and status.
pub fn agent_record(id: &str, status: AgentStatus) -> AgentRecord {
    AgentRecord {
        id: AgentId::from_string(id),
        name: "fix-standards-high".to_string(),
        action: "fix_violations".to_string(),
        target: "demo".to_string(),
        violation_type: None,
        issue_ids: vec!["s1".to_string()],
        model: "openrouter/x-ai/grok-code-fast-1".to_string(),
        status,
        started_at_ms: 0,
        ended_at_ms: None,
        duration_ms: 0,
        pid: None,
        log_path: PathBuf::from(format!("/tmp/agent/{id}.log")),
        metadata: BTreeMap::new(),
        exit_code: None,
        error: None,
    }
}

/// Violations from `(id, severity)` pairs.
pub fn violations(pairs: &[(&str, &str)]) -> Vec<Violation> {
    pairs.iter().map(|(id, severity)| Violation::new(*id, *severity)).collect()
}
