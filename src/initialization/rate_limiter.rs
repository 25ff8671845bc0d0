//! Rate limiter initialization.
//!
//! This module provides a token-bucket rate limiter used to throttle requests
//! against a single platform.

use std::sync::Arc;
use tokio::sync::Semaphore as TokioSemaphore;
use tokio::time::{interval, Duration as TokioDuration};
use tokio_util::sync::CancellationToken;

/// Token-bucket rate limiter for controlling request rate.
///
/// Tokens are replenished by a background task at `rps` per second, up to the
/// burst capacity. Each request consumes a token and waits when none are left.
pub struct RateLimiter {
    permits: Arc<TokioSemaphore>,
    rps: u32,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Waits for a token. The token is consumed, not returned.
    pub async fn acquire(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }

    pub fn rps(&self) -> u32 {
        self.rps
    }

    /// Stops the background replenishment task.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Initializes a token-bucket rate limiter.
///
/// Returns `None` when `rps` is 0 (rate limiting disabled). Must be called
/// from within a Tokio runtime because it spawns the replenishment task.
pub fn init_rate_limiter(rps: u32, burst: usize) -> Option<Arc<RateLimiter>> {
    if rps == 0 {
        return None;
    }
    let capacity = burst.max(1);
    let shutdown = CancellationToken::new();

    let limiter = Arc::new(RateLimiter {
        permits: Arc::new(TokioSemaphore::new(capacity)),
        rps,
        shutdown: shutdown.clone(),
    });

    let permits = Arc::clone(&limiter.permits);
    // Fast ticker; the number of tokens added is derived from elapsed time
    let mut ticker = interval(TokioDuration::from_millis(100));
    tokio::spawn(async move {
        let mut last_time = tokio::time::Instant::now();
        let mut fractional_permits = 0.0f64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = tokio::time::Instant::now();
                    let elapsed = now.duration_since(last_time);
                    last_time = now;

                    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let to_add_f64 = rps as f64 * elapsed.as_secs_f64() + fractional_permits;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let to_add = to_add_f64 as usize;
                    #[allow(clippy::cast_precision_loss)]
                    {
                        fractional_permits = to_add_f64 - to_add as f64;
                    }

                    let room = capacity.saturating_sub(permits.available_permits());
                    let to_add = to_add.min(room);
                    if to_add > 0 {
                        permits.add_permits(to_add);
                    }
                }
                _ = shutdown.cancelled() => {
                    log::debug!("Rate limiter background task shutting down");
                    break;
                }
            }
        }
    });

    Some(limiter)
}
