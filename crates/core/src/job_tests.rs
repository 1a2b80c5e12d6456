// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    pending = { JobStatus::Pending, false },
    queued = { JobStatus::Queued, false },
    running = { JobStatus::Running, false },
    completed = { JobStatus::Completed, true },
    failed = { JobStatus::Failed, true },
    cancelled = { JobStatus::Cancelled, true },
)]
fn job_status_terminal(status: JobStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn scan_status_terminal() {
    assert!(!ScanStatus::Running.is_terminal());
    assert!(ScanStatus::Completed.is_terminal());
    assert!(ScanStatus::Failed.is_terminal());
    assert!(ScanStatus::Cancelled.is_terminal());
}

#[test]
fn options_default_to_both_types_uncapped() {
    let opts = AutomationOptions::new("demo");
    assert_eq!(opts.enabled_types(), vec![ViolationType::Security, ViolationType::Standards]);
    assert_eq!(opts.max_fixes, 0);
    assert_eq!(opts.strategy, Strategy::CriticalFirst);
    assert!(opts.timeout.is_none());
}

#[test]
fn enabled_types_dedupes_and_orders() {
    let opts = AutomationOptions::new("demo").violation_types(vec![
        ViolationType::Standards,
        ViolationType::Security,
        ViolationType::Standards,
    ]);
    assert_eq!(opts.enabled_types(), vec![ViolationType::Security, ViolationType::Standards]);
}

#[test]
fn option_setters_chain() {
    let opts = AutomationOptions::new("demo")
        .max_fixes(2)
        .model("x-ai/grok-code-fast-1")
        .timeout(Duration::from_secs(60))
        .strategy(Strategy::LowFirst);
    assert_eq!(opts.model.as_deref(), Some("x-ai/grok-code-fast-1"));
    assert_eq!(opts.timeout, Some(Duration::from_secs(60)));
    assert_eq!(opts.max_fixes, 2);
}

#[test]
fn loop_record_dispatched_sums_types() {
    let record = LoopRecord {
        loop_number: 1,
        started_at_ms: 0,
        security_dispatched: 3,
        standards_dispatched: 2,
        agent_ids: Vec::new(),
        rescan_triggered: false,
        rescan_results: Vec::new(),
        duration_ms: 0,
        message: String::new(),
    };
    assert_eq!(record.dispatched(), 5);
}

#[test]
fn job_ids_and_run_ids_use_distinct_prefixes() {
    assert!(JobId::new().as_str().starts_with("job-"));
    assert!(RunId::new().as_str().starts_with("run-"));
}
