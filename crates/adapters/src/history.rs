// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fix-history sink: the audit trail of automated fixes.
//!
//! Recording is fire-and-forget. A sink that cannot persist an entry logs
//! and moves on; orchestration never fails because of it.

use af_core::{AgentId, RunId, Severity, ViolationType};

/// One dispatched agent, as seen by the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixStart {
    pub target: String,
    pub violation_type: ViolationType,
    pub severity: Option<Severity>,
    pub agent_id: AgentId,
    pub issue_count: usize,
    pub run_id: RunId,
}

pub trait FixHistorySink: Send + Sync + 'static {
    fn record_start(&self, start: FixStart);
    fn record_completion(&self, agent_id: &AgentId, success: bool);
}

/// Writes history entries to the structured log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHistorySink;

impl FixHistorySink for TracingHistorySink {
    fn record_start(&self, start: FixStart) {
        tracing::info!(
            target_name = %start.target,
            violation_type = %start.violation_type,
            severity = start.severity.map_or("unknown", Severity::as_str),
            agent_id = %start.agent_id,
            issue_count = start.issue_count,
            run_id = %start.run_id,
            "fix started"
        );
    }

    fn record_completion(&self, agent_id: &AgentId, success: bool) {
        tracing::info!(%agent_id, success, "fix finished");
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{FixHistorySink, FixStart};
    use af_core::AgentId;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum HistoryEvent {
        Started(FixStart),
        Completed { agent_id: AgentId, success: bool },
    }

    /// Records every history call in order
    #[derive(Clone, Default)]
    pub struct FakeHistorySink {
        events: Arc<Mutex<Vec<HistoryEvent>>>,
    }

    impl FakeHistorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<HistoryEvent> {
            self.events.lock().clone()
        }

        pub fn starts(&self) -> Vec<FixStart> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    HistoryEvent::Started(start) => Some(start.clone()),
                    HistoryEvent::Completed { .. } => None,
                })
                .collect()
        }

        pub fn completions(&self) -> Vec<(AgentId, bool)> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    HistoryEvent::Completed { agent_id, success } => {
                        Some((agent_id.clone(), *success))
                    }
                    HistoryEvent::Started(_) => None,
                })
                .collect()
        }
    }

    impl FixHistorySink for FakeHistorySink {
        fn record_start(&self, start: FixStart) {
            self.events.lock().push(HistoryEvent::Started(start));
        }

        fn record_completion(&self, agent_id: &AgentId, success: bool) {
            self.events
                .lock()
                .push(HistoryEvent::Completed { agent_id: agent_id.clone(), success });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHistorySink, HistoryEvent};

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
