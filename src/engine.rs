//! The engine facade: parse, check, persist.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::checker::CheckerRegistry;
use crate::config::Config;
use crate::error_handling::{DatabaseError, ProcessingStats};
use crate::initialization::init_client;
use crate::link::{classify, dedup, extract_candidates, ClassifiedLink, Platform, ShareLink};
use crate::orchestrator::{BatchReport, CheckResult, Orchestrator};
use crate::scheduler::{RecheckPolicy, Scheduler};
use crate::storage::{ResultStore, TaskExecution, TrackedLinkSummary};

/// Wires parser, checkers, orchestrator, store and scheduler together.
///
/// One engine per process. The store is opened on construction and closed by
/// [`LinkEngine::shutdown`].
pub struct LinkEngine {
    config: Config,
    store: ResultStore,
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<Scheduler>,
    policy: RecheckPolicy,
}

impl LinkEngine {
    /// Builds an engine with the production checker for every platform.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the HTTP client cannot be built
    /// or the database cannot be opened.
    pub async fn from_config(config: Config) -> Result<Self> {
        let client = init_client(&config).context("Failed to initialize HTTP client")?;
        let registry = CheckerRegistry::with_default_checkers(client, &config.endpoints);
        Self::new(config, registry).await
    }

    /// Builds an engine around caller-supplied checkers.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, a platform has no checker or
    /// the database cannot be opened.
    pub async fn new(config: Config, registry: CheckerRegistry) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        registry.validate().context("Incomplete checker registry")?;

        let store = ResultStore::open(&config.db_path)
            .await
            .with_context(|| format!("Failed to open result store at {}", config.db_path.display()))?;
        let orchestrator = Arc::new(Orchestrator::new(Arc::new(registry), &config));
        let policy = RecheckPolicy::from_config(&config);
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            Arc::clone(&orchestrator),
            policy.clone(),
            config.scheduler_interval(),
        ));

        Ok(Self {
            config,
            store,
            orchestrator,
            scheduler,
            policy,
        })
    }

    /// Checks every share link found in `raw_text`.
    ///
    /// `selected_platforms` overrides the configured allowlist for this batch;
    /// links on other platforms are counted as excluded and never checked.
    /// Every checked link is tracked in the store for later re-checks. Store
    /// failures are logged and do not affect the report.
    pub async fn check_batch(
        &self,
        raw_text: &str,
        selected_platforms: Option<&[Platform]>,
    ) -> BatchReport {
        let start_time = Instant::now();
        let selection = selected_platforms.or(self.config.selected_platforms.as_deref());

        let mut invalid_format_count = 0;
        let mut excluded_count = 0;
        let mut recognized: Vec<ShareLink> = Vec::new();
        for candidate in extract_candidates(raw_text) {
            match classify(candidate) {
                ClassifiedLink::Recognized(link) => {
                    if selection.is_some_and(|allowed| !allowed.contains(&link.platform)) {
                        debug!("Excluding {} (platform not selected)", link.url);
                        excluded_count += 1;
                    } else {
                        recognized.push(link);
                    }
                }
                ClassifiedLink::Unrecognized(candidate) => {
                    debug!("Unrecognized link: {}", candidate.original);
                    invalid_format_count += 1;
                }
            }
        }
        let deduped = dedup(recognized);

        let results = self.orchestrator.check_links(&deduped.unique).await;
        self.track(&results).await;

        let mut report = BatchReport::from_results(results);
        report.invalid_format_count = invalid_format_count;
        report.duplicate_count = deduped.duplicate_count;
        report.excluded_count = excluded_count;
        report.total_duration = start_time.elapsed();
        info!(
            "Batch done: {} checked, {} duplicate, {} invalid format, {} excluded",
            report.checked_count(),
            report.duplicate_count,
            report.invalid_format_count,
            report.excluded_count
        );
        report
    }

    async fn track(&self, results: &[CheckResult]) {
        for result in results {
            let key = result.link.canonical_key();
            let previous = match self.store.get(&key).await {
                Ok(previous) => previous,
                Err(e) => {
                    warn!("Failed to read tracked state for {key}: {e}");
                    None
                }
            };
            let next = self.policy.apply(previous.as_ref(), result);
            if let Err(e) = self.store.upsert(&next).await {
                warn!("Failed to track {key}: {e}");
            }
        }
    }

    /// Operator view of every tracked link, oldest first.
    ///
    /// Carries no authentication; callers exposing it must gate access.
    pub async fn list_scheduled_task_state(&self) -> Result<Vec<TrackedLinkSummary>, DatabaseError> {
        Ok(self
            .store
            .list_all()
            .await?
            .iter()
            .map(|tracked| tracked.summary())
            .collect())
    }

    /// Most recent scheduler passes, newest first.
    pub async fn recent_executions(&self, limit: u32) -> Result<Vec<TaskExecution>, DatabaseError> {
        self.store.recent_executions(limit).await
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Starts the periodic re-check loop until `cancel` fires.
    pub fn spawn_scheduler(&self, cancel: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.scheduler).spawn(cancel)
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Failure categories behind pending results since startup.
    pub fn stats(&self) -> &ProcessingStats {
        self.orchestrator.stats()
    }

    /// Stops rate limiters and closes the store.
    pub async fn shutdown(self) {
        self.orchestrator.shutdown();
        self.store.close().await;
    }
}
