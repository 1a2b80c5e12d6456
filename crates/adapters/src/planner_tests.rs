// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("v{i}")).collect()
}

#[parameterized(
    exact = { 10, 10, vec![10] },
    split = { 25, 10, vec![10, 10, 5] },
    single = { 3, 1, vec![1, 1, 1] },
    under = { 2, 10, vec![2] },
    empty = { 0, 10, vec![] },
)]
fn group_chunks_preserving_order(count: usize, capacity: usize, sizes: Vec<usize>) {
    let all = ids(count);
    let groups = ChunkPlanner::default()
        .group("demo", ViolationType::Security, &all, capacity)
        .unwrap();
    assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), sizes);
    assert_eq!(groups.concat(), all);
}

#[test]
fn group_rejects_zero_capacity() {
    let err = ChunkPlanner::default().group("demo", ViolationType::Security, &ids(2), 0);
    assert!(matches!(err, Err(AdapterError::Planner(_))));
}

#[test]
fn render_fills_template() {
    let planner = ChunkPlanner::new("{type}/{target}: {count} [{issues}] {severity} {other}");
    let prompt = planner
        .render(&PromptRequest {
            target: "demo".to_string(),
            violation_type: ViolationType::Standards,
            issue_ids: vec!["s1".to_string(), "s2".to_string()],
            severity: Some(Severity::High),
        })
        .unwrap();
    assert_eq!(prompt, "standards/demo: 2 [s1, s2] high {other}");
}

#[test]
fn default_template_mentions_every_issue() {
    let prompt = ChunkPlanner::default()
        .render(&PromptRequest {
            target: "demo".to_string(),
            violation_type: ViolationType::Security,
            issue_ids: vec!["a".to_string(), "b".to_string()],
            severity: None,
        })
        .unwrap();
    assert!(prompt.contains("Issue ids: a, b"));
    assert!(prompt.contains("highest severity: unknown"));
}

#[test]
fn render_rejects_empty_group() {
    let err = ChunkPlanner::default().render(&PromptRequest {
        target: "demo".to_string(),
        violation_type: ViolationType::Security,
        issue_ids: Vec::new(),
        severity: None,
    });
    assert!(err.is_err());
}
