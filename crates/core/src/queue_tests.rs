// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn queue_of(n: usize) -> IssueQueue {
    IssueQueue::new((0..n).map(|i| format!("v{i}")).collect())
}

#[test]
fn next_batch_drains_in_load_order() {
    let mut q = queue_of(5);
    assert_eq!(q.next_batch(2, None), vec!["v0", "v1"]);
    assert_eq!(q.next_batch(2, None), vec!["v2", "v3"]);
    assert_eq!(q.next_batch(2, None), vec!["v4"]);
    assert!(q.next_batch(2, None).is_empty());
    assert!(q.is_empty());
}

#[yare::parameterized(
    allowance_below_limit = { 10, Some(3), 3 },
    limit_below_allowance = { 2, Some(7), 2 },
    zero_allowance = { 10, Some(0), 0 },
    unbounded = { 4, None, 4 },
    beyond_length = { 50, None, 8 },
)]
fn next_batch_respects_limit_and_allowance(limit: usize, allowance: Option<usize>, taken: usize) {
    let mut q = queue_of(8);
    assert_eq!(q.next_batch(limit, allowance).len(), taken);
    assert_eq!(q.remaining(), 8 - taken);
    assert_eq!(q.cursor(), taken);
}

#[test]
fn from_violations_keeps_given_order() {
    let vs = vec![Violation::new("s1", "critical"), Violation::new("s0", "low")];
    let q = IssueQueue::from_violations(&vs);
    assert_eq!(q.pending(), &["s1".to_string(), "s0".to_string()]);
    assert_eq!(q.len(), 2);
}

#[test]
fn empty_queue() {
    let mut q = IssueQueue::default();
    assert!(q.is_empty());
    assert!(q.next_batch(5, Some(5)).is_empty());
}

proptest! {
    #[test]
    fn never_returns_an_id_twice(
        len in 0usize..60,
        takes in proptest::collection::vec((0usize..10, proptest::option::of(0usize..10)), 0..20),
    ) {
        let mut q = queue_of(len);
        let mut seen = HashSet::new();
        for (limit, allowance) in takes {
            let before = q.remaining();
            let batch = q.next_batch(limit, allowance);
            prop_assert_eq!(q.remaining(), before - batch.len());
            prop_assert!(q.cursor() <= q.len());
            for id in batch {
                prop_assert!(seen.insert(id));
            }
        }
    }
}
