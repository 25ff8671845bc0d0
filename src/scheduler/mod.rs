//! Periodic re-checking of tracked links.
//!
//! Each pass reads due links from the store, runs them through the
//! orchestrator like a fresh batch, applies [`RecheckPolicy`] and writes the
//! results back. Passes never overlap.

mod policy;

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error_handling::DatabaseError;
use crate::link::ShareLink;
use crate::orchestrator::Orchestrator;
use crate::storage::{ExecutionStatus, PassSummary, ResultStore, TrackedLink, TrackedStatus};

pub use policy::RecheckPolicy;

const INTERRUPTED: &str = "interrupted by shutdown";

// Statuses a pass may pick links from; expired links are never re-checked.
const SELECTABLE: [TrackedStatus; 3] = [
    TrackedStatus::Pending,
    TrackedStatus::Valid,
    TrackedStatus::Invalid,
];

/// Result of asking for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// Another pass was already running.
    Skipped,
    /// Shutdown interrupted the pass; links not yet written keep their old rows.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerStatus {
    Active,
    Stopped,
}

/// Snapshot of the scheduler for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerState {
    /// A pass is in progress right now.
    pub running: bool,
    pub status: SchedulerStatus,
    pub interval_secs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

/// Re-check loop over the result store.
pub struct Scheduler {
    store: ResultStore,
    orchestrator: Arc<Orchestrator>,
    policy: RecheckPolicy,
    interval: Duration,
    running: AtomicBool,
    active: AtomicBool,
    // Epoch millis; 0 means never
    last_run_ms: AtomicI64,
    next_run_ms: AtomicI64,
}

/// Clears the run-in-progress flag when a pass ends, even on error.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Scheduler {
    pub fn new(
        store: ResultStore,
        orchestrator: Arc<Orchestrator>,
        policy: RecheckPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            policy,
            interval,
            running: AtomicBool::new(false),
            active: AtomicBool::new(false),
            last_run_ms: AtomicI64::new(0),
            next_run_ms: AtomicI64::new(0),
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState {
            running: self.running.load(Ordering::SeqCst),
            status: if self.active.load(Ordering::SeqCst) {
                SchedulerStatus::Active
            } else {
                SchedulerStatus::Stopped
            },
            interval_secs: self.interval.as_secs(),
            last_run: load_time(&self.last_run_ms),
            next_run: load_time(&self.next_run_ms),
        }
    }

    /// Runs one pass unless one is already in flight.
    ///
    /// Store failures end the pass early; the execution row records them.
    pub async fn run_once(&self) -> Result<PassOutcome, DatabaseError> {
        self.run_until(&CancellationToken::new()).await
    }

    async fn run_until(&self, cancel: &CancellationToken) -> Result<PassOutcome, DatabaseError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Scheduler pass already running, skipping");
            return Ok(PassOutcome::Skipped);
        }
        let _guard = RunGuard(&self.running);

        let started = Utc::now();
        self.last_run_ms
            .store(started.timestamp_millis(), Ordering::SeqCst);
        let execution_id = self.store.record_execution_start(started).await?;

        let outcome = tokio::select! {
            outcome = self.pass(started) => outcome,
            _ = cancel.cancelled() => {
                info!("Scheduler pass interrupted by shutdown");
                self.finish_execution(
                    execution_id,
                    ExecutionStatus::Failed,
                    &PassSummary::default(),
                    Some(INTERRUPTED),
                )
                .await;
                return Ok(PassOutcome::Cancelled);
            }
        };
        let (status, summary, error) = match &outcome {
            Ok(summary) => (ExecutionStatus::Success, summary.clone(), None),
            Err(e) => (ExecutionStatus::Failed, PassSummary::default(), Some(e.to_string())),
        };
        self.finish_execution(execution_id, status, &summary, error.as_deref())
            .await;

        let summary = outcome?;
        info!(
            "Scheduler pass: {} due, {} valid, {} invalid, {} pending, {} expired",
            summary.links_count,
            summary.valid_count,
            summary.invalid_count,
            summary.pending_count,
            summary.expired_count
        );
        Ok(PassOutcome::Completed(summary))
    }

    async fn finish_execution(
        &self,
        execution_id: i64,
        status: ExecutionStatus,
        summary: &PassSummary,
        error: Option<&str>,
    ) {
        if let Err(e) = self
            .store
            .record_execution_finish(execution_id, status, summary, error, Utc::now())
            .await
        {
            warn!("Failed to record scheduler execution {execution_id}: {e}");
        }
    }

    async fn pass(&self, now: DateTime<Utc>) -> Result<PassSummary, DatabaseError> {
        let mut due: Vec<TrackedLink> = Vec::new();
        for status in SELECTABLE {
            due.extend(
                self.store
                    .list_by_status(status)
                    .await?
                    .into_iter()
                    .filter(|tracked| self.policy.is_due(tracked, now)),
            );
        }

        let mut summary = PassSummary {
            links_count: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            debug!("No tracked links due");
            return Ok(summary);
        }

        let links: Vec<ShareLink> = due.iter().map(|t| t.link.clone()).collect();
        let results = self.orchestrator.check_links(&links).await;
        summary.checked_count = results.len();

        for (previous, result) in due.iter().zip(&results) {
            let next = self.policy.apply(Some(previous), result);
            match next.status {
                TrackedStatus::Valid => summary.valid_count += 1,
                TrackedStatus::Invalid => summary.invalid_count += 1,
                TrackedStatus::Pending => summary.pending_count += 1,
                TrackedStatus::Expired => {
                    info!("Giving up on {} after {} attempts", next.key(), next.attempts);
                    summary.expired_count += 1;
                }
            }
            self.store.upsert(&next).await?;
        }
        Ok(summary)
    }

    /// Starts the interval loop. The first pass runs immediately.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.active.store(true, Ordering::SeqCst);
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Scheduler started (interval {:?})", self.interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let step = chrono::Duration::from_std(self.interval)
                            .unwrap_or_else(|_| chrono::Duration::zero());
                        let next = Utc::now() + step;
                        self.next_run_ms.store(next.timestamp_millis(), Ordering::SeqCst);
                        match self.run_until(&cancel).await {
                            Ok(PassOutcome::Cancelled) => break,
                            Ok(PassOutcome::Completed(_)) | Ok(PassOutcome::Skipped) => {}
                            Err(e) => warn!("Scheduler pass failed: {e}"),
                        }
                    }
                    _ = cancel.cancelled() => {
                        break;
                    }
                }
            }

            self.active.store(false, Ordering::SeqCst);
            self.next_run_ms.store(0, Ordering::SeqCst);
            info!("Scheduler stopped");
        })
    }
}

fn load_time(cell: &AtomicI64) -> Option<DateTime<Utc>> {
    match cell.load(Ordering::SeqCst) {
        0 => None,
        ms => Utc.timestamp_millis_opt(ms).single(),
    }
}
