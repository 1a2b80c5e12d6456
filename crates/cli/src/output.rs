// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of loop progress and final job snapshots.

use crate::color;
use af_core::{JobSnapshot, LoopRecord};

/// Compact elapsed time, e.g. `850ms`, `12s`, `3m05s`, `1h20m`.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1_000;
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3_600, (secs % 3_600) / 60),
    }
}

/// One line per loop plus one indented line per re-scan.
pub fn format_loop(record: &LoopRecord) -> String {
    let mut out = format!(
        "{} {} {}",
        color::header(&format!("loop {}:", record.loop_number)),
        record.message,
        color::context(&format!(
            "[security {}, standards {}; {}]",
            record.security_dispatched,
            record.standards_dispatched,
            format_duration_ms(record.duration_ms)
        )),
    );
    for rescan in &record.rescan_results {
        out.push_str(&format!(
            "\n  re-scan {} {}: {} (queue {})",
            rescan.violation_type, rescan.status, rescan.summary, rescan.reloaded
        ));
    }
    out
}

pub fn format_snapshot(snapshot: &JobSnapshot) -> String {
    let mut lines = vec![
        format!("{} {} {}", snapshot.id, snapshot.target, color::status(snapshot.status)),
        format!("  {}", snapshot.message),
        format!(
            "  loops {}, attempted {}, remaining security {} standards {}",
            snapshot.loop_count,
            snapshot.attempted,
            snapshot.security_remaining,
            snapshot.standards_remaining
        ),
    ];
    if let Some(error) = snapshot.error.as_deref().filter(|e| *e != snapshot.message) {
        lines.push(format!("  error: {error}"));
    }
    if let (Some(started), Some(completed)) = (snapshot.started_at_ms, snapshot.completed_at_ms) {
        lines.push(color::context(&format!(
            "  ran for {}",
            format_duration_ms(completed.saturating_sub(started))
        )));
    }
    lines.join("\n")
}

pub fn print_snapshot(snapshot: &JobSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        println!("{}", format_snapshot(snapshot));
    }
    Ok(())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
