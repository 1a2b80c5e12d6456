// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `af run`: drive one automation job in the foreground.
//!
//! Ctrl-C once asks the job to stop after the current loop; a second Ctrl-C
//! cancels it outright.

use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use af_adapters::{
    ChunkPlanner, CommandScanTrigger, FileViolationProvider, LocalSpawner, ProcessSpawner,
    TracingHistorySink,
};
use af_core::{AutomationOptions, Severity, Strategy, SystemClock, ViolationType};
use af_engine::{AgentManager, AgentManagerConfig, AutomationDeps, AutomationRunner};

use crate::config::Config;
use crate::exit_error::ExitError;
use crate::logging;
use crate::output::{format_loop, print_snapshot};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);
const AGENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Repository or project to remediate
    pub target: String,
    /// Violation type to fix (repeatable; default: all)
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<ViolationType>,
    /// Only fix these severities (repeatable; default: all)
    #[arg(long = "severity", value_name = "SEVERITY")]
    pub severities: Vec<Severity>,
    /// Dispatch order: critical_first, low_first, security_first, standards_first
    #[arg(long, default_value_t = Strategy::default())]
    pub strategy: Strategy,
    /// Pause between loops
    #[arg(long, default_value_t = 0)]
    pub loop_delay_secs: u64,
    /// Overall deadline for the job (0 = none)
    #[arg(long, default_value_t = 0)]
    pub timeout_secs: u64,
    /// Stop after this many issues were dispatched (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_fixes: usize,
    /// Model override for every agent in this job
    #[arg(long)]
    pub model: Option<String>,
}

impl RunArgs {
    pub fn options(&self) -> AutomationOptions {
        let mut options = AutomationOptions::new(self.target.clone())
            .severities(self.severities.clone())
            .strategy(self.strategy)
            .loop_delay(Duration::from_secs(self.loop_delay_secs))
            .max_fixes(self.max_fixes);
        if !self.types.is_empty() {
            options = options.violation_types(self.types.clone());
        }
        if self.timeout_secs > 0 {
            options = options.timeout(Duration::from_secs(self.timeout_secs));
        }
        if let Some(model) = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            options = options.model(model.to_string());
        }
        options
    }
}

/// Production collaborators for the runner.
pub fn build_deps(config: &Config, state_dir: &Path) -> AutomationDeps<SystemClock> {
    let spawner: Arc<dyn ProcessSpawner> = Arc::new(LocalSpawner::new());
    let history = Arc::new(TracingHistorySink);
    let agents = AgentManager::new(
        AgentManagerConfig {
            settings: config.agent.clone(),
            log_dir: logging::log_dir(state_dir),
        },
        Arc::clone(&spawner),
        history.clone(),
        SystemClock,
    );
    AutomationDeps {
        agents,
        violations: Arc::new(FileViolationProvider::new(config.reports_dir(state_dir))),
        scans: Arc::new(CommandScanTrigger::new(config.scan.command.clone(), spawner)),
        planner: Arc::new(ChunkPlanner::default()),
        history,
        clock: SystemClock,
    }
}

pub async fn handle(args: RunArgs, config: Config, state_dir: &Path, json: bool) -> Result<()> {
    let deps = build_deps(&config, state_dir);
    let agents = deps.agents.clone();
    let runner = AutomationRunner::new(deps, config.automation.clone());

    let job = runner.start(args.options()).await?;
    if !json {
        println!("started {} for {} ({})", job.id(), job.target(), job.run_id());
    }

    let mut printed = 0;
    let mut interrupts = 0;
    let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        tokio::select! {
            _ = job.finished() => break,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                interrupts += 1;
                if interrupts == 1 {
                    runner.request_stop_after_loop(job.id())?;
                    eprintln!("stopping after the current loop (Ctrl-C again to cancel)");
                } else {
                    runner.cancel(job.id())?;
                }
            }
            _ = progress.tick() => {
                if !json {
                    printed = print_new_loops(&job.snapshot().loops, printed);
                }
            }
        }
    }

    let snapshot = job.snapshot();
    if !json {
        print_new_loops(&snapshot.loops, printed);
    }
    print_snapshot(&snapshot, json)?;

    // Agents stopped by a cancel are reaped in the background
    let drained = tokio::time::timeout(AGENT_DRAIN_TIMEOUT, async {
        while !agents.list_agents().is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(job_id = %job.id(), "agents still running at exit");
    }

    match ExitError::for_status(snapshot.status) {
        Some(exit) => Err(exit.into()),
        None => Ok(()),
    }
}

fn print_new_loops(loops: &[af_core::LoopRecord], printed: usize) -> usize {
    for record in loops.iter().skip(printed) {
        println!("{}", format_loop(record));
    }
    loops.len().max(printed)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
