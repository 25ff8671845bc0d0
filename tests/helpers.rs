// Shared test helpers: fake checkers, registries and configs.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum::IntoEnumIterator;

use pan_check::checker::{CheckerRegistry, LinkChecker, Verdict};
use pan_check::error_handling::ErrorType;
use pan_check::{Config, LinkEngine, Platform, ShareLink};

/// Answers from markers in the share id, counting every call.
///
/// - `dead` → invalid "分享已删除"
/// - `busy` → pending (rate limited)
/// - `slow` → valid after a pause
/// - `stuck` → valid after a minute
/// - anything else → valid
pub struct FakeChecker {
    platform: Platform,
    calls: Arc<AtomicUsize>,
}

impl FakeChecker {
    #[allow(dead_code)] // Used by other test files
    pub fn new(platform: Platform, calls: Arc<AtomicUsize>) -> Self {
        Self { platform, calls }
    }
}

#[async_trait]
impl LinkChecker for FakeChecker {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = link.share_id.to_ascii_lowercase();
        if id.contains("stuck") {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if id.contains("slow") {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        if id.contains("dead") {
            Verdict::invalid("分享已删除")
        } else if id.contains("busy") {
            Verdict::pending("platform rate-limited", ErrorType::HttpRequestTooManyRequests)
        } else {
            Verdict::valid()
        }
    }
}

/// Registry with a [`FakeChecker`] for every platform, sharing one call counter.
#[allow(dead_code)] // Used by other test files
pub fn fake_registry(calls: Arc<AtomicUsize>) -> CheckerRegistry {
    let mut registry = CheckerRegistry::new();
    for platform in Platform::iter() {
        registry.register(Arc::new(FakeChecker::new(platform, Arc::clone(&calls))));
    }
    registry
}

/// In-memory store, no rate limiting, immediate pending re-checks.
#[allow(dead_code)] // Used by other test files
pub fn test_config() -> Config {
    Config {
        db_path: ":memory:".into(),
        max_concurrency: 8,
        check_timeout_secs: 5,
        batch_timeout_secs: 30,
        scheduler_interval_secs: 1,
        recheck_base_delay_secs: 0,
        ..Default::default()
    }
}

/// Engine over fake checkers; returns the shared call counter too.
#[allow(dead_code)] // Used by other test files
pub async fn fake_engine(config: Config) -> (LinkEngine, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = LinkEngine::new(config, fake_registry(Arc::clone(&calls)))
        .await
        .expect("Failed to build test engine");
    (engine, calls)
}
