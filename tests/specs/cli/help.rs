// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn af_help_lists_run() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("run");
}

#[test]
fn af_run_help_shows_flags() {
    cli()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("--type")
        .stdout_has("--severity")
        .stdout_has("--strategy")
        .stdout_has("--max-fixes")
        .stdout_has("--timeout-secs");
}

#[test]
fn af_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn unknown_violation_type_is_rejected() {
    cli().args(&["run", "demo", "--type", "style"]).expect_code(2).stderr_has("style");
}
