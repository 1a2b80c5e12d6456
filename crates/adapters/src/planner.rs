// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch planning: split a batch into agent-sized groups and describe each
//! group's task.

use crate::AdapterError;
use crate::template::interpolate;
use af_core::{Severity, ViolationType};

/// Everything a prompt template can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub target: String,
    pub violation_type: ViolationType,
    pub issue_ids: Vec<String>,
    pub severity: Option<Severity>,
}

pub trait BatchPlanner: Send + Sync + 'static {
    /// Split `ids` into groups of at most `capacity` issues, order preserved.
    fn group(
        &self,
        target: &str,
        violation_type: ViolationType,
        ids: &[String],
        capacity: usize,
    ) -> Result<Vec<Vec<String>>, AdapterError>;

    fn render(&self, request: &PromptRequest) -> Result<String, AdapterError>;
}

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Fix the following {count} {type} violation(s) in \
scenario `{target}` (highest severity: {severity}).\n\
Issue ids: {issues}\n\
Change only what is needed to resolve each issue and keep the build passing.";

/// Fixed-size chunking plus a `{placeholder}` prompt template.
///
/// Placeholders: `{target}`, `{type}`, `{count}`, `{issues}`, `{severity}`.
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    template: String,
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TEMPLATE)
    }
}

impl ChunkPlanner {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }
}

impl BatchPlanner for ChunkPlanner {
    fn group(
        &self,
        _target: &str,
        _violation_type: ViolationType,
        ids: &[String],
        capacity: usize,
    ) -> Result<Vec<Vec<String>>, AdapterError> {
        if capacity == 0 {
            return Err(AdapterError::Planner("agent capacity must be at least 1".to_string()));
        }
        Ok(ids.chunks(capacity).map(<[String]>::to_vec).collect())
    }

    fn render(&self, request: &PromptRequest) -> Result<String, AdapterError> {
        if request.issue_ids.is_empty() {
            return Err(AdapterError::Planner("no issues to describe".to_string()));
        }
        let severity = request.severity.map_or("unknown", Severity::as_str);
        let count = request.issue_ids.len().to_string();
        let issues = request.issue_ids.join(", ");
        let vars = [
            ("target", request.target.as_str()),
            ("type", request.violation_type.as_str()),
            ("count", count.as_str()),
            ("issues", issues.as_str()),
            ("severity", severity),
        ];
        Ok(interpolate(&self.template, &vars))
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
