// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af-adapters: boundaries to everything outside the orchestrator
//!
//! ```text
//! ViolationProvider  scanner findings per target and type
//! ScanTrigger        start and poll re-scans
//! BatchPlanner       split batches to agent size, render task prompts
//! FixHistorySink     fire-and-forget fix audit trail
//! ProcessSpawner     the only OS-facing seam (spawn, stream, wait, kill)
//! ```

mod error;
pub mod history;
pub mod planner;
pub mod process;
pub mod scan;
pub mod template;
pub mod violations;

pub use error::AdapterError;
pub use history::{FixHistorySink, FixStart, TracingHistorySink};
pub use planner::{BatchPlanner, ChunkPlanner, PromptRequest};
pub use process::{
    expand_args, ExitOutcome, LocalSpawner, OutputStream, ProcessControl, ProcessError,
    ProcessSpawner, ProcessSpec, SpawnedProcess,
};
pub use scan::{CommandScanTrigger, ScanHandle, ScanPoll, ScanTrigger};
pub use template::interpolate;
pub use violations::{filter_by_severity, FileViolationProvider, ViolationProvider};

#[cfg(any(test, feature = "test-support"))]
pub use history::{FakeHistorySink, HistoryEvent};
#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeScript, FakeSpawner};
#[cfg(any(test, feature = "test-support"))]
pub use scan::FakeScanTrigger;
#[cfg(any(test, feature = "test-support"))]
pub use violations::FakeViolationProvider;
