// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification from the tail of an agent log.
//!
//! Checked in order, first match wins:
//!
//! ```text
//! ProviderModelNotFoundError   → model name + override hint
//! credential signatures        → API key hint
//! last line containing "error" → that line
//! last non-empty line          → that line
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Longest log line quoted in a failure message
pub const MAX_DETAIL_CHARS: usize = 200;

const AUTH_SIGNATURES: &[&str] = &[
    "invalid api key",
    "invalid_api_key",
    "invalid credentials",
    "401 unauthorized",
    "authentication failed",
];

#[allow(clippy::expect_used)]
static MODEL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"modelID["']?\s*[=:]\s*["']?([^\s"',}\]]+)"#)
        .expect("constant regex pattern is valid")
});

fn truncate(line: &str) -> String {
    let line = line.trim();
    match line.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((end, _)) => format!("{}…", &line[..end]),
        None => line.to_string(),
    }
}

/// Best explanation found in `tail`, if any.
pub fn diagnose(tail: &[String], configured_model: &str) -> Option<String> {
    if let Some(line) = tail.iter().rev().find(|l| l.contains("ProviderModelNotFoundError")) {
        let model = MODEL_ID
            .captures(line)
            .or_else(|| tail.iter().rev().find_map(|l| MODEL_ID.captures(l)))
            .and_then(|c| c.get(1))
            .map_or(configured_model, |m| m.as_str());
        return Some(format!(
            "model `{model}` was not found by the provider; choose another model with --model \
             or set agent.default_model"
        ));
    }

    let auth = tail.iter().any(|l| {
        let lower = l.to_ascii_lowercase();
        AUTH_SIGNATURES.iter().any(|sig| lower.contains(sig))
    });
    if auth {
        return Some(
            "authentication with the model provider failed; check the provider API key in the \
             agent environment"
                .to_string(),
        );
    }

    if let Some(line) = tail.iter().rev().find(|l| l.to_ascii_lowercase().contains("error")) {
        return Some(truncate(line));
    }

    tail.iter().rev().find(|l| !l.trim().is_empty()).map(|l| truncate(l))
}

/// Failure message for an agent: the log diagnosis combined with the
/// process's own error text when they differ.
pub fn classify_failure(tail: &[String], configured_model: &str, process_error: &str) -> String {
    match diagnose(tail, configured_model) {
        Some(detail) if detail != process_error => format!("{process_error}: {detail}"),
        _ => process_error.to_string(),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
