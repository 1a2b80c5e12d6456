// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide registry of automation jobs.
//!
//! At most one non-terminal job per target; at most `max_concurrent_jobs`
//! jobs past admission at any time.

use super::{AutomationDeps, AutomationJob};
use crate::error::AutomationError;
use af_core::{AutomationOptions, AutomationSettings, Clock, JobId, JobSnapshot};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

struct Registry<C: Clock> {
    active: HashMap<JobId, Arc<AutomationJob<C>>>,
    /// Final snapshots of unregistered jobs, oldest first
    finished: VecDeque<JobSnapshot>,
}

impl<C: Clock> Registry<C> {
    fn has_live_job(&self, target: &str) -> bool {
        self.active.values().any(|job| job.target() == target && !job.status().is_terminal())
    }
}

struct RunnerInner<C: Clock> {
    deps: AutomationDeps<C>,
    settings: AutomationSettings,
    slots: Arc<Semaphore>,
    registry: RwLock<Registry<C>>,
}

pub struct AutomationRunner<C: Clock> {
    inner: Arc<RunnerInner<C>>,
}

impl<C: Clock> Clone for AutomationRunner<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Clock> AutomationRunner<C> {
    pub fn new(deps: AutomationDeps<C>, settings: AutomationSettings) -> Self {
        let slots = Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1)));
        Self {
            inner: Arc::new(RunnerInner {
                deps,
                settings,
                slots,
                registry: RwLock::new(Registry {
                    active: HashMap::new(),
                    finished: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.inner.settings
    }

    /// Validate, load and launch a job. Returns as soon as the job is
    /// registered; admission and the control loop run in the background.
    pub async fn start(
        &self,
        options: AutomationOptions,
    ) -> Result<Arc<AutomationJob<C>>, AutomationError> {
        let target = options.target.trim().to_string();
        if target.is_empty() {
            return Err(AutomationError::EmptyTarget);
        }
        if self.inner.registry.read().has_live_job(&target) {
            return Err(AutomationError::AlreadyRunning { target });
        }

        let job = AutomationJob::create(
            options,
            self.inner.deps.clone(),
            self.inner.settings.clone(),
        )
        .await?;

        {
            // Another start may have registered the target while we loaded
            let mut registry = self.inner.registry.write();
            if registry.has_live_job(&target) {
                return Err(AutomationError::AlreadyRunning { target });
            }
            registry.active.insert(job.id().clone(), Arc::clone(&job));
        }

        let runner = self.clone();
        let task_job = Arc::clone(&job);
        tokio::spawn(async move {
            task_job.run(Arc::clone(&runner.inner.slots)).await;
            runner.unregister(&task_job);
        });

        Ok(job)
    }

    fn unregister(&self, job: &AutomationJob<C>) {
        let snapshot = job.snapshot();
        let cap = self.inner.settings.finished_history;
        let mut registry = self.inner.registry.write();
        registry.active.remove(job.id());
        if cap > 0 {
            registry.finished.push_back(snapshot);
            while registry.finished.len() > cap {
                registry.finished.pop_front();
            }
        }
        tracing::debug!(job_id = %job.id(), "automation job unregistered");
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        let registry = self.inner.registry.read();
        if let Some(job) = registry.active.get(id) {
            return Some(job.snapshot());
        }
        registry.finished.iter().rev().find(|s| &s.id == id).cloned()
    }

    /// Active and recently finished jobs, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let registry = self.inner.registry.read();
        let mut all: Vec<JobSnapshot> = registry
            .active
            .values()
            .map(|job| job.snapshot())
            .chain(
                registry
                    .finished
                    .iter()
                    .filter(|s| !registry.active.contains_key(&s.id))
                    .cloned(),
            )
            .collect();
        all.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Hard-cancel a job. Finished jobs are returned unchanged.
    pub fn cancel(&self, id: &JobId) -> Result<JobSnapshot, AutomationError> {
        let job = self.inner.registry.read().active.get(id).cloned();
        match job {
            Some(job) => {
                job.cancel();
                Ok(job.snapshot())
            }
            None => self.get(id).ok_or_else(|| AutomationError::NotFound(id.to_string())),
        }
    }

    /// Graceful stop of one job. `true` when this call requested it.
    pub fn request_stop_after_loop(&self, id: &JobId) -> Result<bool, AutomationError> {
        let job = self.inner.registry.read().active.get(id).cloned();
        match job {
            Some(job) => Ok(job.request_stop()),
            None if self.get(id).is_some() => Ok(false),
            None => Err(AutomationError::NotFound(id.to_string())),
        }
    }

    /// Graceful stop of every active job; returns how many were signaled.
    pub fn request_stop_all(&self) -> usize {
        self.active_jobs().iter().filter(|job| job.request_stop()).count()
    }

    /// Stop everything: graceful first, hard cancel after `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        let jobs = self.active_jobs();
        if jobs.is_empty() {
            return;
        }
        tracing::info!(jobs = jobs.len(), grace_secs = grace.as_secs(), "shutting down automation");
        for job in &jobs {
            job.request_stop();
        }

        let graceful = tokio::time::timeout(grace, async {
            for job in &jobs {
                job.finished().await;
            }
        })
        .await;

        if graceful.is_err() {
            for job in &jobs {
                if job.cancel() {
                    tracing::warn!(job_id = %job.id(), "grace period elapsed, cancelling");
                }
            }
            for job in &jobs {
                job.finished().await;
            }
        }
    }

    fn active_jobs(&self) -> Vec<Arc<AutomationJob<C>>> {
        self.inner.registry.read().active.values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
