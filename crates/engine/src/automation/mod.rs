// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automated-fix orchestration: per-target jobs and the runner that admits
//! them.

mod job;
mod runner;

pub use job::AutomationJob;
pub use runner::AutomationRunner;

use crate::agent_manager::AgentManager;
use af_adapters::{BatchPlanner, FixHistorySink, ScanTrigger, ViolationProvider};
use af_core::Clock;
use std::sync::Arc;

/// Services shared by every automation job.
pub struct AutomationDeps<C: Clock> {
    pub agents: AgentManager<C>,
    pub violations: Arc<dyn ViolationProvider>,
    pub scans: Arc<dyn ScanTrigger>,
    pub planner: Arc<dyn BatchPlanner>,
    pub history: Arc<dyn FixHistorySink>,
    pub clock: C,
}

impl<C: Clock> Clone for AutomationDeps<C> {
    fn clone(&self) -> Self {
        Self {
            agents: self.agents.clone(),
            violations: Arc::clone(&self.violations),
            scans: Arc::clone(&self.scans),
            planner: Arc::clone(&self.planner),
            history: Arc::clone(&self.history),
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
#[path = "test_helpers.rs"]
mod test_helpers;
