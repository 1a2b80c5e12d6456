// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `af run` against file reports and a shell agent.

use crate::prelude::*;

const RECORD_IDS: &str = r#"echo "$AUTOFIX_ISSUE_IDS" >> fixed.txt"#;

#[test]
fn most_severe_issues_are_fixed_first() {
    let temp = Project::empty();
    temp.report("demo", "standards", &[("s1", "low"), ("s2", "critical"), ("s3", "high")]);
    temp.agent_script(RECORD_IDS);

    temp.af()
        .args(&["run", "demo", "--type", "standards", "--max-fixes", "2"])
        .passes()
        .stdout_has("loop 1: dispatched 2 issue(s) to 1 agent(s)")
        .stdout_has("completed")
        .stdout_has("maximum automated fixes reached (2)");

    similar_asserts::assert_eq!(temp.read("work/fixed.txt"), "s2,s3\n");
}

#[test]
fn json_output_is_the_final_snapshot() {
    let temp = Project::empty();
    temp.report("demo", "security", &[("a", "high"), ("b", "medium")]);
    temp.agent_script(RECORD_IDS);

    let result = temp.af().args(&["run", "demo", "--max-fixes", "2", "--json"]).passes();
    let snapshot = result.json();

    assert_eq!(snapshot["target"], "demo");
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["attempted"], 2);
    assert_eq!(snapshot["loops"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["loops"][0]["security_dispatched"], 2);
}

#[test]
fn severity_filter_limits_the_queue() {
    let temp = Project::empty();
    temp.report("demo", "security", &[("a", "critical"), ("b", "low")]);
    temp.agent_script(RECORD_IDS);

    temp.af()
        .args(&["run", "demo", "--severity", "critical", "--max-fixes", "1"])
        .passes()
        .stdout_lacks("failed");

    similar_asserts::assert_eq!(temp.read("work/fixed.txt"), "a\n");
}

#[test]
fn failing_agent_fails_the_run() {
    let temp = Project::empty();
    temp.report("demo", "security", &[("a", "critical")]);
    temp.agent_script(r#"echo "Error: could not apply patch" >&2; exit 1"#);

    temp.af()
        .args(&["run", "demo"])
        .expect_code(1)
        .stdout_has("failed")
        .stdout_has("exited with code 1: Error: could not apply patch");
}

#[test]
fn deadline_fails_the_run() {
    let temp = Project::empty();
    temp.report("demo", "security", &[("a", "critical")]);
    temp.agent_script("exec sleep 30");

    temp.af()
        .args(&["run", "demo", "--timeout-secs", "1"])
        .expect_code(1)
        .stdout_has("automation deadline exceeded");
}

#[test]
fn missing_reports_are_an_error() {
    let temp = Project::empty();
    temp.agent_script(RECORD_IDS);

    temp.af().args(&["run", "demo"]).fails().stderr_has("no matching violations for demo");
}

#[test]
fn invalid_config_is_reported() {
    let temp = Project::empty();
    temp.file("state/autofix.toml", "[automation]\nmax_concurrent_jobs = \"two\"\n");

    temp.af().args(&["run", "demo"]).fails().stderr_has("invalid config");
}

#[test]
fn agent_log_is_written_under_state_dir() {
    let temp = Project::empty();
    temp.report("demo", "standards", &[("s1", "high")]);
    temp.agent_script(r#"echo "patched $AUTOFIX_TARGET""#);

    temp.af().args(&["run", "demo", "--max-fixes", "1"]).passes();

    let logs: Vec<_> = std::fs::read_dir(temp.state_dir().join("logs/agent"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(logs.len(), 1);
    let log = std::fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("patched demo"), "log was:\n{log}");
}
