// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af-core: data model and pure policy for the autofix orchestrator

pub mod macros;

pub mod agent_record;
pub mod clock;
pub mod id;
pub mod job;
pub mod queue;
pub mod settings;
pub mod severity;
pub mod violation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent_record::{AgentId, AgentRecord, AgentStatus};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::short;
pub use job::{
    AutomationOptions, JobId, JobSnapshot, JobStatus, LoopRecord, RescanOutcome, RunId,
    ScanStatus,
};
pub use queue::IssueQueue;
pub use settings::{AgentSettings, AutomationSettings};
pub use severity::{highest_severity, sort_violations, ParseEnumError, Severity, Strategy};
pub use violation::{Violation, ViolationType};
