// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Violation provider: the scanners' current findings for a target.

use crate::AdapterError;
use af_core::{Severity, Violation, ViolationType};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Source of current findings, consulted at job creation and on every
/// queue reload.
#[async_trait]
pub trait ViolationProvider: Send + Sync + 'static {
    /// Findings of one type, restricted to `severities` (empty = all).
    async fn list_violations(
        &self,
        target: &str,
        violation_type: ViolationType,
        severities: &[Severity],
    ) -> Result<Vec<Violation>, AdapterError>;
}

/// Keep violations whose label parses to one of `severities`.
///
/// An empty filter keeps everything, including unknown labels.
pub fn filter_by_severity(violations: Vec<Violation>, severities: &[Severity]) -> Vec<Violation> {
    if severities.is_empty() {
        return violations;
    }
    violations
        .into_iter()
        .filter(|v| Severity::parse(&v.severity).is_some_and(|s| severities.contains(&s)))
        .collect()
}

/// Target names become path segments; keep them to one plain segment.
pub(crate) fn validate_target(target: &str) -> Result<(), AdapterError> {
    let ok = !target.is_empty()
        && target != "."
        && target != ".."
        && target.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(AdapterError::InvalidTarget(target.to_string()))
    }
}

/// Reads scanner reports from `<dir>/<target>/<type>.json`.
///
/// Each report is a JSON array of violations. A missing report means the
/// scanner found nothing.
#[derive(Debug, Clone)]
pub struct FileViolationProvider {
    dir: PathBuf,
}

impl FileViolationProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self, target: &str, violation_type: ViolationType) -> PathBuf {
        self.dir.join(target).join(format!("{}.json", violation_type.as_str()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ViolationProvider for FileViolationProvider {
    async fn list_violations(
        &self,
        target: &str,
        violation_type: ViolationType,
        severities: &[Severity],
    ) -> Result<Vec<Violation>, AdapterError> {
        validate_target(target)?;
        let path = self.report_path(target, violation_type);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(%target, %violation_type, path = %path.display(), "no report");
                return Ok(Vec::new());
            }
            Err(source) => return Err(AdapterError::Read { path, source }),
        };
        let violations: Vec<Violation> = serde_json::from_slice(&bytes)
            .map_err(|source| AdapterError::Parse { path: path.clone(), source })?;
        Ok(filter_by_severity(violations, severities))
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{filter_by_severity, ViolationProvider};
    use crate::AdapterError;
    use af_core::{Severity, Violation, ViolationType};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeViolationState {
        /// Consumed front to back; the last entry keeps answering
        responses: HashMap<ViolationType, VecDeque<Vec<Violation>>>,
        fail_next: Option<String>,
        calls: Vec<(String, ViolationType)>,
    }

    /// In-memory provider with scripted answers per violation type
    #[derive(Clone, Default)]
    pub struct FakeViolationProvider {
        inner: Arc<Mutex<FakeViolationState>>,
    }

    impl FakeViolationProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the answer for the next listing of `violation_type`.
        pub fn push(&self, violation_type: ViolationType, violations: Vec<Violation>) {
            self.inner.lock().responses.entry(violation_type).or_default().push_back(violations);
        }

        pub fn fail_next(&self, message: &str) {
            self.inner.lock().fail_next = Some(message.to_string());
        }

        pub fn calls(&self) -> Vec<(String, ViolationType)> {
            self.inner.lock().calls.clone()
        }

        pub fn call_count(&self, violation_type: ViolationType) -> usize {
            self.inner.lock().calls.iter().filter(|(_, t)| *t == violation_type).count()
        }
    }

    #[async_trait]
    impl ViolationProvider for FakeViolationProvider {
        async fn list_violations(
            &self,
            target: &str,
            violation_type: ViolationType,
            severities: &[Severity],
        ) -> Result<Vec<Violation>, AdapterError> {
            let mut state = self.inner.lock();
            state.calls.push((target.to_string(), violation_type));
            if let Some(message) = state.fail_next.take() {
                return Err(AdapterError::Other(message));
            }
            let queue = state.responses.entry(violation_type).or_default();
            let violations = if queue.len() > 1 {
                queue.pop_front().unwrap_or_default()
            } else {
                queue.front().cloned().unwrap_or_default()
            };
            Ok(filter_by_severity(violations, severities))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeViolationProvider;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
