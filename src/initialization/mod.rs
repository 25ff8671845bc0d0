//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - HTTP client
//! - Concurrency semaphores and per-platform rate limiters
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod rate_limiter;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
pub use rate_limiter::{init_rate_limiter, RateLimiter};

/// Initializes a semaphore for controlling concurrency.
///
/// Used both for the global cap on in-flight checks and for each platform's
/// own cap.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
