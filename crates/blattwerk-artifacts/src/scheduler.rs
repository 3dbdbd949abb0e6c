// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cleanup scheduling for the artifact directory.
//
// Three paths reclaim files:
//   * deferred  after a successful response, delete the request's artifacts
//               once a grace delay has passed (background task);
//   * eager     on a failed request, delete what it wrote right away;
//   * sweep     at most once per interval, delete every file in the
//               directory older than the maximum age, whoever owns it.
// All of them go through idempotent deletes, so they may race freely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use blattwerk_core::error::Result;
use blattwerk_core::types::RequestId;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::ledger::{ArtifactLedger, CleanupReport, remove_file_quietly};

/// Where a request's artifact set is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CleanupState {
    /// Artifacts exist and nothing has claimed them yet.
    Pending,
    /// A deferred deletion is waiting out its delay.
    ScheduledForDeletion,
    /// Removed by the deferred or eager path.
    Deleted,
    /// Removed by the age sweep before anything else got to it.
    SweptAndDeleted,
}

struct Settled {
    state: CleanupState,
    at: SystemTime,
}

#[derive(Default)]
struct SchedulerState {
    last_sweep: Option<SystemTime>,
    scheduled: HashMap<RequestId, JoinHandle<()>>,
    settled: HashMap<RequestId, Settled>,
}

struct SchedulerInner {
    ledger: ArtifactLedger,
    sweep_interval: Duration,
    max_age: Duration,
    state: Mutex<SchedulerState>,
}

/// Cloneable handle shared between request handlers and background tasks.
#[derive(Clone)]
pub struct CleanupScheduler {
    inner: Arc<SchedulerInner>,
}

impl CleanupScheduler {
    pub fn new(ledger: ArtifactLedger, sweep_interval: Duration, max_age: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                ledger,
                sweep_interval,
                max_age,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    pub fn ledger(&self) -> &ArtifactLedger {
        &self.inner.ledger
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> SystemTime {
        self.inner.ledger.clock().now()
    }

    fn settle(&self, owner: RequestId, state: CleanupState) {
        let at = self.now();
        let mut guard = self.state();
        guard.scheduled.remove(&owner);
        guard.settled.insert(owner, Settled { state, at });
    }

    /// Current state of `owner`'s artifact set.
    pub fn state_of(&self, owner: RequestId) -> CleanupState {
        let guard = self.state();
        if guard.scheduled.contains_key(&owner) {
            return CleanupState::ScheduledForDeletion;
        }
        if let Some(settled) = guard.settled.get(&owner) {
            return settled.state;
        }
        CleanupState::Pending
    }

    // -- Deferred path -------------------------------------------------------

    /// Delete `owner`'s artifacts after `delay`, off the caller's path.
    ///
    /// Without a running tokio runtime the deletion happens immediately.
    #[instrument(skip_all, fields(%owner, delay_ms = delay.as_millis() as u64))]
    pub fn schedule_deferred(&self, owner: RequestId, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, deleting request artifacts now");
            self.cleanup_now(owner);
            return;
        };

        let scheduler = self.clone();
        let mut guard = self.state();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // file deletes block, keep them off the async workers
            let ledger = scheduler.inner.ledger.clone();
            match tokio::task::spawn_blocking(move || ledger.delete_request(owner)).await {
                Ok(report) => {
                    scheduler.settle(owner, CleanupState::Deleted);
                    info!(%owner, deleted = report.deleted_files, "deferred cleanup ran");
                }
                Err(err) => {
                    scheduler.state().scheduled.remove(&owner);
                    warn!(%owner, %err, "deferred cleanup did not finish, leaving it to the sweep");
                }
            }
        });
        if let Some(previous) = guard.scheduled.insert(owner, handle) {
            previous.abort();
        }
        debug!("deferred cleanup scheduled");
    }

    /// Run every waiting deferred deletion now instead of at its deadline.
    pub fn flush(&self) -> CleanupReport {
        let waiting: Vec<(RequestId, JoinHandle<()>)> = self.state().scheduled.drain().collect();
        let mut total = CleanupReport::default();
        for (owner, handle) in waiting {
            handle.abort();
            let report = self.inner.ledger.delete_request(owner);
            total.deleted_files += report.deleted_files;
            total.freed_bytes += report.freed_bytes;
            self.settle(owner, CleanupState::Deleted);
        }
        if total.deleted_files > 0 {
            info!(deleted = total.deleted_files, "deferred cleanups flushed");
        }
        total
    }

    /// Number of deferred deletions still waiting.
    pub fn pending_deferred(&self) -> usize {
        self.state().scheduled.values().filter(|handle| !handle.is_finished()).count()
    }

    // -- Eager path ----------------------------------------------------------

    /// Delete `owner`'s artifacts synchronously. Used when a request fails.
    pub fn cleanup_now(&self, owner: RequestId) -> CleanupReport {
        if let Some(handle) = self.state().scheduled.remove(&owner) {
            handle.abort();
        }
        let report = self.inner.ledger.delete_request(owner);
        self.settle(owner, CleanupState::Deleted);
        debug!(%owner, deleted = report.deleted_files, "eager cleanup ran");
        report
    }

    // -- Sweep path ----------------------------------------------------------

    /// Sweep if the interval has elapsed since the last pass; otherwise do
    /// nothing and return `None`.
    pub fn maybe_sweep(&self) -> Option<CleanupReport> {
        let now = self.now();
        {
            let mut guard = self.state();
            if let Some(last) = guard.last_sweep {
                let since = now.duration_since(last).unwrap_or(Duration::ZERO);
                if since < self.inner.sweep_interval {
                    return None;
                }
            }
            guard.last_sweep = Some(now);
        }
        Some(self.sweep_now())
    }

    /// Delete every file in the artifact directory whose modification time
    /// is older than the maximum age.
    #[instrument(skip(self), fields(max_age_secs = self.inner.max_age.as_secs()))]
    pub fn sweep_now(&self) -> CleanupReport {
        let now = self.now();
        let mut report = CleanupReport::default();
        let entries = match std::fs::read_dir(self.inner.ledger.root()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, "artifact directory unreadable, sweep skipped");
                return report;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(now);
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.inner.max_age {
                continue;
            }
            match remove_file_quietly(&path) {
                Ok(bytes) => {
                    report.deleted_files += 1;
                    report.freed_bytes += bytes;
                    if let Some(artifact) = self.inner.ledger.forget_path(&path) {
                        self.note_swept(artifact.owner);
                    }
                }
                Err(err) => warn!(%err, path = %path.display(), "failed to sweep file"),
            }
        }

        self.prune_settled(now);
        info!(deleted = report.deleted_files, freed = report.freed_bytes, "sweep finished");
        report
    }

    fn note_swept(&self, owner: RequestId) {
        if !self.inner.ledger.all_for_request(owner).is_empty() {
            return;
        }
        let already_deleted = matches!(
            self.state().settled.get(&owner).map(|s| s.state),
            Some(CleanupState::Deleted)
        );
        if !already_deleted {
            self.settle(owner, CleanupState::SweptAndDeleted);
        }
    }

    fn prune_settled(&self, now: SystemTime) {
        let max_age = self.inner.max_age;
        self.state()
            .settled
            .retain(|_, settled| now.duration_since(settled.at).unwrap_or(Duration::ZERO) <= max_age);
    }

    // -- Purge ---------------------------------------------------------------

    /// Delete every file in the artifact directory regardless of age, forget
    /// the ledger, and restart the sweep interval.
    #[instrument(skip(self))]
    pub fn purge(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        for entry in std::fs::read_dir(self.inner.ledger.root())?.flatten() {
            let path = entry.path();
            if !entry.metadata().map(|meta| meta.is_file()).unwrap_or(false) {
                continue;
            }
            match remove_file_quietly(&path) {
                Ok(bytes) => {
                    report.deleted_files += 1;
                    report.freed_bytes += bytes;
                }
                Err(err) => warn!(%err, path = %path.display(), "failed to purge file"),
            }
        }
        let forgotten = self.inner.ledger.forget_all();
        self.state().last_sweep = Some(self.now());
        info!(deleted = report.deleted_files, freed = report.freed_bytes, forgotten, "artifact directory purged");
        Ok(report)
    }

    /// When the last sweep pass ran.
    pub fn last_sweep(&self) -> Option<SystemTime> {
        self.state().last_sweep
    }
}
