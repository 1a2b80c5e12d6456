// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor-based issue queue.
//!
//! A queue is loaded once in its final order and only ever advances; a
//! reload replaces it wholesale with a new generation.

use crate::violation::Violation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQueue {
    ids: Vec<String>,
    cursor: usize,
}

impl IssueQueue {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids, cursor: 0 }
    }

    /// Build from violations already sorted by the severity policy.
    pub fn from_violations(violations: &[Violation]) -> Self {
        Self::new(violations.iter().map(|v| v.id.clone()).collect())
    }

    /// Take up to `limit` ids, further clamped by `allowance` when present.
    pub fn next_batch(&mut self, limit: usize, allowance: Option<usize>) -> Vec<String> {
        let want = match allowance {
            Some(allowance) => limit.min(allowance),
            None => limit,
        };
        let end = (self.cursor + want).min(self.ids.len());
        let batch = self.ids[self.cursor..end].to_vec();
        self.cursor = end;
        batch
    }

    pub fn remaining(&self) -> usize {
        self.ids.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ids not yet handed out, in drain order.
    pub fn pending(&self) -> &[String] {
        &self.ids[self.cursor..]
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
