// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af-engine: the automated-fix orchestrator
//!
//! [`AutomationRunner`] admits per-target [`AutomationJob`]s; each job drives
//! remediation agents through the [`AgentManager`].

mod agent_logger;
pub mod agent_manager;
pub mod automation;
mod classify;
mod error;
mod signal;

pub use agent_logger::read_tail;
pub use agent_manager::{
    normalize_model, scaled_limits, AgentConfig, AgentManager, AgentManagerConfig, AgentOutcome,
    AgentWatch,
};
pub use automation::{AutomationDeps, AutomationJob, AutomationRunner};
pub use classify::{classify_failure, diagnose};
pub use error::{AgentError, AutomationError};
pub use signal::StopSignal;
