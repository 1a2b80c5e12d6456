// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors from collaborator adapters
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid target name: {0:?}")]
    InvalidTarget(String),
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("malformed violation report {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("scan failed to start: {0}")]
    ScanStart(String),
    #[error("unknown scan handle: {0}")]
    UnknownScan(String),
    #[error("planner error: {0}")]
    Planner(String),
    #[error("{0}")]
    Other(String),
}
