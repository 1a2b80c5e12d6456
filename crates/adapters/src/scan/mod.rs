// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-scan trigger: asks the scanners to refresh a target's findings.

use crate::process::{expand_args, ProcessSpawner, ProcessSpec};
use crate::AdapterError;
use af_core::{ScanStatus, ViolationType};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Handle returned by [`ScanTrigger::start_scan`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanHandle {
    pub id: String,
    pub target: String,
    pub violation_type: ViolationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPoll {
    pub status: ScanStatus,
    pub summary: String,
}

impl ScanPoll {
    pub fn new(status: ScanStatus, summary: impl Into<String>) -> Self {
        Self { status, summary: summary.into() }
    }
}

#[async_trait]
pub trait ScanTrigger: Send + Sync + 'static {
    async fn start_scan(
        &self,
        target: &str,
        violation_type: ViolationType,
    ) -> Result<ScanHandle, AdapterError>;

    async fn poll_scan(&self, handle: &ScanHandle) -> Result<ScanPoll, AdapterError>;
}

/// Runs an external scanner command per re-scan.
///
/// The argv template accepts `{target}` and `{type}`. An empty template
/// disables scanning: every scan completes immediately. A scan is forgotten
/// once a poll has reported its terminal status.
pub struct CommandScanTrigger {
    command: Vec<String>,
    spawner: Arc<dyn ProcessSpawner>,
    scans: Arc<Mutex<HashMap<String, ScanPoll>>>,
    next_id: AtomicU64,
}

impl CommandScanTrigger {
    pub fn new(command: Vec<String>, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            command,
            spawner,
            scans: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

/// Last non-blank line of a scanner stream. Earlier lines are dropped as read.
async fn last_line(stream: Option<crate::OutputStream>) -> Option<String> {
    let mut reader = BufReader::new(stream?);
    let mut buf = Vec::new();
    let mut last = None;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // Lossy: scanner output only feeds the summary line
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if !line.is_empty() {
                    last = Some(line.to_string());
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "scanner output stream closed");
                break;
            }
        }
    }
    last
}

#[async_trait]
impl ScanTrigger for CommandScanTrigger {
    async fn start_scan(
        &self,
        target: &str,
        violation_type: ViolationType,
    ) -> Result<ScanHandle, AdapterError> {
        let id = format!("scan-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle =
            ScanHandle { id: id.clone(), target: target.to_string(), violation_type };

        let Some((program, args)) = self.command.split_first() else {
            self.scans.lock().insert(id, ScanPoll::new(ScanStatus::Completed, "scan skipped"));
            return Ok(handle);
        };

        let vars = [("target", target), ("type", violation_type.as_str())];
        let spec = ProcessSpec::new(program.clone()).args(expand_args(args, &vars));
        let spawned = self
            .spawner
            .spawn(spec)
            .await
            .map_err(|e| AdapterError::ScanStart(e.to_string()))?;

        self.scans.lock().insert(id.clone(), ScanPoll::new(ScanStatus::Running, ""));
        tracing::info!(%target, %violation_type, scan_id = %id, "re-scan started");

        let scans = Arc::clone(&self.scans);
        tokio::spawn(async move {
            let mut control = spawned.control;
            let (stdout, stderr) =
                tokio::join!(last_line(spawned.stdout), last_line(spawned.stderr));
            let poll = match control.wait().await {
                Ok(exit) if exit.success() => ScanPoll::new(
                    ScanStatus::Completed,
                    stdout.as_deref().unwrap_or("scan completed"),
                ),
                Ok(exit) => {
                    let detail = stderr.or(stdout);
                    let summary = match detail {
                        Some(detail) => format!("{}: {detail}", exit.describe()),
                        None => exit.describe(),
                    };
                    ScanPoll::new(ScanStatus::Failed, summary)
                }
                Err(e) => ScanPoll::new(ScanStatus::Failed, e.to_string()),
            };
            tracing::info!(
                scan_id = %id,
                status = %poll.status,
                summary = %poll.summary,
                "re-scan finished"
            );
            scans.lock().insert(id, poll);
        });

        Ok(handle)
    }

    async fn poll_scan(&self, handle: &ScanHandle) -> Result<ScanPoll, AdapterError> {
        let mut scans = self.scans.lock();
        let poll = scans
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownScan(handle.id.clone()))?;
        if poll.status.is_terminal() {
            scans.remove(&handle.id);
        }
        Ok(poll)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ScanHandle, ScanPoll, ScanTrigger};
    use crate::AdapterError;
    use af_core::{ScanStatus, ViolationType};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeScanState {
        outcomes: HashMap<ViolationType, ScanPoll>,
        polls_before_done: u32,
        polls: HashMap<String, u32>,
        starts: Vec<(String, ViolationType)>,
        fail_start: Option<String>,
    }

    /// Scan trigger whose scans finish after a fixed number of polls
    #[derive(Clone, Default)]
    pub struct FakeScanTrigger {
        inner: Arc<Mutex<FakeScanState>>,
    }

    impl FakeScanTrigger {
        pub fn new() -> Self {
            Self::default()
        }

        /// Final poll result for scans of `violation_type` (default: completed).
        pub fn set_outcome(
            &self,
            violation_type: ViolationType,
            status: ScanStatus,
            summary: &str,
        ) {
            self.inner.lock().outcomes.insert(violation_type, ScanPoll::new(status, summary));
        }

        /// Report `running` this many times before the outcome.
        pub fn set_polls_before_done(&self, polls: u32) {
            self.inner.lock().polls_before_done = polls;
        }

        pub fn fail_start(&self, message: &str) {
            self.inner.lock().fail_start = Some(message.to_string());
        }

        pub fn starts(&self) -> Vec<(String, ViolationType)> {
            self.inner.lock().starts.clone()
        }
    }

    #[async_trait]
    impl ScanTrigger for FakeScanTrigger {
        async fn start_scan(
            &self,
            target: &str,
            violation_type: ViolationType,
        ) -> Result<ScanHandle, AdapterError> {
            let mut state = self.inner.lock();
            if let Some(ref message) = state.fail_start {
                return Err(AdapterError::ScanStart(message.clone()));
            }
            state.starts.push((target.to_string(), violation_type));
            let id = format!("fake-scan-{}", state.starts.len());
            state.polls.insert(id.clone(), 0);
            Ok(ScanHandle { id, target: target.to_string(), violation_type })
        }

        async fn poll_scan(&self, handle: &ScanHandle) -> Result<ScanPoll, AdapterError> {
            let mut state = self.inner.lock();
            let limit = state.polls_before_done;
            let Some(count) = state.polls.get_mut(&handle.id) else {
                return Err(AdapterError::UnknownScan(handle.id.clone()));
            };
            if *count < limit {
                *count += 1;
                return Ok(ScanPoll::new(ScanStatus::Running, ""));
            }
            Ok(state
                .outcomes
                .get(&handle.violation_type)
                .cloned()
                .unwrap_or_else(|| ScanPoll::new(ScanStatus::Completed, "scan completed")))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScanTrigger;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
