//! pan_check library: share-link validation for cloud-storage platforms
//!
//! Pulls share links for nine platforms (Quark, UC, Baidu, Tianyi, 123Pan, 115,
//! Aliyun, Xunlei, 139 MobileCloud) out of free text, checks them concurrently
//! against each platform's API, and keeps re-checking unresolved links on a
//! schedule until they settle or expire.
//!
//! # Example
//!
//! ```no_run
//! use pan_check::{Config, LinkEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     max_concurrency: 10,
//!     ..Default::default()
//! };
//! let engine = LinkEngine::from_config(config).await?;
//!
//! let report = engine
//!     .check_batch("https://pan.quark.cn/s/abcdef 提取码: 1234", None)
//!     .await;
//! println!(
//!     "{} valid, {} invalid, {} pending",
//!     report.valid_links.len(),
//!     report.invalid_links.len(),
//!     report.pending_links.len()
//! );
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod app;
pub mod checker;
pub mod config;
mod engine;
pub mod error_handling;
pub mod initialization;
pub mod link;
pub mod orchestrator;
pub mod scheduler;
pub mod storage;

// Re-export public API
pub use app::{print_batch_summary, print_error_statistics};
pub use checker::{CheckerRegistry, LinkChecker, LinkStatus, Verdict};
pub use config::{Config, LogFormat, LogLevel, PlatformEndpoints};
pub use engine::LinkEngine;
pub use link::{Platform, ShareLink};
pub use orchestrator::{BatchReport, CheckResult};
pub use scheduler::{PassOutcome, RecheckPolicy, Scheduler, SchedulerState, SchedulerStatus};
pub use storage::{
    ResultStore, TaskExecution, TrackedLink, TrackedLinkSummary, TrackedStatus,
};
