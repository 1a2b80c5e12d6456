// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Severity ranking and dispatch strategies.
//!
//! Ordering is decided once when a queue is loaded:
//!
//! ```text
//! critical_first | security_first | standards_first:  critical → high → medium → low → info → unknown
//! low_first:                                          info → low → medium → high → critical → unknown
//! ```
//!
//! Ties are broken by violation id so the same input always yields the same
//! queue.

use crate::violation::{Violation, ViolationType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

/// Error for string → enum parsing of policy values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] =
        [Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info];

    /// Lenient parse of scanner labels; `None` for anything unrecognized.
    pub fn parse(label: &str) -> Option<Severity> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" => Some(Severity::Info),
            _ => None,
        }
    }

    /// 0 is most severe
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

crate::simple_display! {
    Severity {
        Critical => "critical",
        High => "high",
        Medium => "medium",
        Low => "low",
        Info => "info",
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::parse(s).ok_or_else(|| ParseEnumError::new("severity", s))
    }
}

/// Which work an automation job drains first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    CriticalFirst,
    LowFirst,
    SecurityFirst,
    StandardsFirst,
}

impl Strategy {
    /// Violation types in the order a loop iteration dispatches them.
    pub fn dispatch_order(self) -> [ViolationType; 2] {
        match self {
            Strategy::StandardsFirst => [ViolationType::Standards, ViolationType::Security],
            _ => [ViolationType::Security, ViolationType::Standards],
        }
    }

    fn ascending(self) -> bool {
        matches!(self, Strategy::LowFirst)
    }
}

crate::simple_display! {
    Strategy {
        CriticalFirst => "critical_first",
        LowFirst => "low_first",
        SecurityFirst => "security_first",
        StandardsFirst => "standards_first",
    }
}

impl FromStr for Strategy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "critical_first" => Ok(Strategy::CriticalFirst),
            "low_first" => Ok(Strategy::LowFirst),
            "security_first" => Ok(Strategy::SecurityFirst),
            "standards_first" => Ok(Strategy::StandardsFirst),
            _ => Err(ParseEnumError::new("strategy", s)),
        }
    }
}

/// Sort key: known severities first (in strategy direction), unknown last.
fn sort_key(label: &str, strategy: Strategy) -> (bool, u8) {
    match Severity::parse(label) {
        Some(sev) if strategy.ascending() => (false, Severity::Info.rank() - sev.rank()),
        Some(sev) => (false, sev.rank()),
        None => (true, 0),
    }
}

fn compare(a: &Violation, b: &Violation, strategy: Strategy) -> Ordering {
    sort_key(&a.severity, strategy)
        .cmp(&sort_key(&b.severity, strategy))
        .then_with(|| a.id.cmp(&b.id))
}

/// Order violations for draining under `strategy`.
pub fn sort_violations(violations: &mut [Violation], strategy: Strategy) {
    violations.sort_by(|a, b| compare(a, b, strategy));
}

/// Most severe recognized label among `labels`.
pub fn highest_severity<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<Severity> {
    labels.into_iter().filter_map(Severity::parse).min()
}

#[cfg(test)]
#[path = "severity_tests.rs"]
mod tests;
