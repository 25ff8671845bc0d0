//! Per-platform concurrency and rate limits.

use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::initialization::{init_rate_limiter, init_semaphore, RateLimiter};
use crate::link::Platform;

/// Semaphore and optional token bucket for each platform.
pub(crate) struct PlatformThrottle {
    semaphores: HashMap<Platform, Arc<Semaphore>>,
    limiters: HashMap<Platform, Arc<RateLimiter>>,
}

impl PlatformThrottle {
    /// Must be called inside a Tokio runtime when `rps > 0`.
    pub(crate) fn new(concurrency: usize, rps: u32) -> Self {
        let burst = concurrency.min((rps as usize).saturating_mul(2)).max(1);
        let mut semaphores = HashMap::new();
        let mut limiters = HashMap::new();
        for platform in Platform::iter() {
            semaphores.insert(platform, init_semaphore(concurrency));
            if let Some(limiter) = init_rate_limiter(rps, burst) {
                limiters.insert(platform, limiter);
            }
        }
        Self {
            semaphores,
            limiters,
        }
    }

    /// Waits for the platform's turn. Hold the permit for the whole check.
    pub(crate) async fn admit(&self, platform: Platform) -> Option<OwnedSemaphorePermit> {
        let permit = match self.semaphores.get(&platform) {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };
        if let Some(limiter) = self.limiters.get(&platform) {
            limiter.acquire().await;
        }
        permit
    }

    pub(crate) fn shutdown(&self) {
        for limiter in self.limiters.values() {
            limiter.shutdown();
        }
    }
}
