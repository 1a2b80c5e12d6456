// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Violations as reported by the scanners.

use crate::severity::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The two independent violation streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Security,
    Standards,
}

impl ViolationType {
    pub const ALL: [ViolationType; 2] = [ViolationType::Security, ViolationType::Standards];

    pub fn as_str(self) -> &'static str {
        match self {
            ViolationType::Security => "security",
            ViolationType::Standards => "standards",
        }
    }
}

crate::simple_display! {
    ViolationType {
        Security => "security",
        Standards => "standards",
    }
}

impl FromStr for ViolationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "security" => Ok(ViolationType::Security),
            "standards" | "standard" => Ok(ViolationType::Standards),
            _ => Err(ParseEnumError::new("violation type", s)),
        }
    }
}

/// A single finding. Only `id` and `severity` drive orchestration; the rest
/// is carried through to prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: String,
    /// Free-form severity label; unknown labels sort last.
    pub severity: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl Violation {
    pub fn new(id: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity: severity.into(),
            rule: String::new(),
            file: None,
            message: String::new(),
        }
    }

    crate::setters! {
        into {
            rule: String,
            message: String,
        }
        option {
            file: String,
        }
    }
}
