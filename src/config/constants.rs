//! Configuration constants.
//!
//! Defaults for concurrency, timeouts, scheduling and size limits. `Config::default()`
//! is built from these values, so the CLI and library agree on them.

use std::time::Duration;

/// Default number of link checks allowed in flight at once (K).
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;
/// Default number of concurrent checks against any single platform.
pub const DEFAULT_PER_PLATFORM_CONCURRENCY: usize = 5;
/// Default per-platform request rate. 0 disables the token bucket.
pub const DEFAULT_PER_PLATFORM_RPS: u32 = 0;

/// Per-check timeout in seconds.
/// Covers every HTTP round trip a checker makes for one link (Quark needs two).
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 15;
/// Wall-clock cap for a whole batch in seconds.
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 120;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Maximum number of redirect hops to follow (Quark short links, page checks)
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Seconds between scheduler passes.
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 600;
/// Consecutive pending outcomes after which a tracked link is marked expired.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Consecutive identical terminal outcomes needed before a link stops being re-checked.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u32 = 1;
/// Upper bound on the back-off between two re-checks of the same pending link.
pub const RECHECK_MAX_DELAY: Duration = Duration::from_secs(6 * 60 * 60);

/// Interval at which batch progress is logged while checks are outstanding.
pub const LOGGING_INTERVAL: u64 = 5;

pub const DB_PATH: &str = "./pan_check.db";

/// Maximum URL length accepted by the extractor
pub const MAX_URL_LENGTH: usize = 2048;
/// Maximum response body we parse from a platform (share pages are small)
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;
/// Maximum reason length kept for a result. Platform messages are truncated beyond it.
pub const MAX_REASON_LENGTH: usize = 200;

/// Default User-Agent string for platform requests.
///
/// The share APIs reject obviously non-browser clients, so this mimics a desktop
/// Chrome. Override with `--user-agent`.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

// Reason strings shared across the orchestrator and checkers
pub const REASON_TIMEOUT: &str = "请求超时";
pub const REASON_BATCH_TIMEOUT: &str = "batch timeout";
pub const REASON_RATE_LIMITED: &str = "platform rate-limited";
pub const REASON_CHECKER_PANIC: &str = "检测异常";
