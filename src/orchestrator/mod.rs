//! Concurrent check dispatch.
//!
//! Takes deduplicated links and returns one [`CheckResult`] per link, in input
//! order, no matter how checks complete: slow checks time out, panicking
//! checkers are isolated, and the batch deadline resolves whatever is left.

mod report;
mod throttle;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::app::{log_progress, shutdown_gracefully};
use crate::checker::{CheckerRegistry, Verdict};
use crate::config::{
    Config, LOGGING_INTERVAL, REASON_BATCH_TIMEOUT, REASON_CHECKER_PANIC, REASON_TIMEOUT,
};
use crate::error_handling::{ErrorType, ProcessingStats};
use crate::initialization::init_semaphore;
use crate::link::ShareLink;

pub use report::{BatchReport, CheckResult};
use throttle::PlatformThrottle;

/// Runs checks with bounded concurrency and deadlines.
pub struct Orchestrator {
    registry: Arc<CheckerRegistry>,
    global: Arc<Semaphore>,
    throttle: Arc<PlatformThrottle>,
    check_timeout: Duration,
    batch_timeout: Duration,
    stats: Arc<ProcessingStats>,
}

impl Orchestrator {
    /// Builds an orchestrator from a validated config.
    ///
    /// Must be called inside a Tokio runtime when per-platform rate limiting
    /// is enabled.
    pub fn new(registry: Arc<CheckerRegistry>, config: &Config) -> Self {
        Self {
            registry,
            global: init_semaphore(config.max_concurrency),
            throttle: Arc::new(PlatformThrottle::new(
                config.per_platform_concurrency,
                config.per_platform_rps,
            )),
            check_timeout: config.check_timeout(),
            batch_timeout: config.batch_timeout(),
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Error categories seen since this orchestrator was built.
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Checks every link; `results[i]` belongs to `links[i]`.
    pub async fn check_links(&self, links: &[ShareLink]) -> Vec<CheckResult> {
        let total = links.len();
        if total == 0 {
            return Vec::new();
        }
        let start_time = std::time::Instant::now();
        let deadline = Instant::now() + self.batch_timeout;
        let completed = Arc::new(AtomicUsize::new(0));

        let mut slots: Vec<Option<CheckResult>> = vec![None; total];
        let mut tasks = FuturesUnordered::new();
        let mut abort_handles = AbortOnDrop(Vec::with_capacity(total));

        for (index, link) in links.iter().enumerate() {
            let Some(checker) = self.registry.get(link.platform).map(Arc::clone) else {
                warn!("No checker registered for {}, leaving pending", link.platform);
                slots[index] = Some(CheckResult::from_verdict(
                    link.clone(),
                    Verdict::pending("no checker registered", ErrorType::UnexpectedResponse),
                    Duration::ZERO,
                ));
                continue;
            };
            let link = link.clone();
            let global = Arc::clone(&self.global);
            let throttle = Arc::clone(&self.throttle);
            let completed = Arc::clone(&completed);
            let check_timeout = self.check_timeout;

            let handle = tokio::spawn(async move {
                // Platform turn before a global slot; links waiting on a platform hold none
                let _platform_permit = throttle.admit(link.platform).await;
                let _permit = global.acquire_owned().await.ok();

                let started = std::time::Instant::now();
                let verdict = match tokio::time::timeout(check_timeout, checker.check(&link)).await
                {
                    Ok(verdict) => verdict,
                    Err(_) => {
                        debug!("Check of {} timed out", link.canonical_key());
                        Verdict::pending(REASON_TIMEOUT, ErrorType::CheckTimeout)
                    }
                };
                completed.fetch_add(1, Ordering::SeqCst);
                CheckResult::from_verdict(link, verdict, started.elapsed())
            });
            abort_handles.0.push(handle.abort_handle());
            tasks.push(async move { (index, handle.await) });
        }

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        // Stops the logger if this future is dropped mid-batch
        let _stop_logging = cancel.clone().drop_guard();
        let completed_for_logging = Arc::clone(&completed);
        let logging_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL));
            // First tick fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_progress(start_time, &completed_for_logging, total);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        });

        loop {
            match tokio::time::timeout_at(deadline, tasks.next()).await {
                Ok(Some((index, Ok(result)))) => slots[index] = Some(result),
                Ok(Some((index, Err(join_error)))) => {
                    warn!(
                        "Checker task for {} panicked: {join_error}",
                        links[index].canonical_key()
                    );
                    slots[index] = Some(CheckResult::from_verdict(
                        links[index].clone(),
                        Verdict::pending(REASON_CHECKER_PANIC, ErrorType::CheckerPanic),
                        Duration::ZERO,
                    ));
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Batch deadline of {:?} reached with {} checks outstanding",
                        self.batch_timeout,
                        tasks.len()
                    );
                    abort_handles.abort_all();
                    break;
                }
            }
        }

        shutdown_gracefully(cancel, Some(logging_task)).await;

        let results: Vec<CheckResult> = slots
            .into_iter()
            .zip(links)
            .map(|(slot, link)| {
                slot.unwrap_or_else(|| {
                    CheckResult::from_verdict(
                        link.clone(),
                        Verdict::pending(REASON_BATCH_TIMEOUT, ErrorType::BatchTimeout),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        for error in results.iter().filter_map(|r| r.error) {
            self.stats.increment_error(error);
        }
        debug!(
            "Checked {} links in {:.2}s",
            total,
            start_time.elapsed().as_secs_f64()
        );
        results
    }

    /// Stops background rate-limiter tasks.
    pub fn shutdown(&self) {
        self.throttle.shutdown();
    }
}

/// Aborts outstanding check tasks, at the deadline or when the batch is dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl AbortOnDrop {
    fn abort_all(&self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.abort_all();
    }
}
