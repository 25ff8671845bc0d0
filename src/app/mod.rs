//! Run-time helpers shared by the orchestrator, scheduler and CLI.
//!
//! Progress logging, background task shutdown and end-of-run statistics.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::shutdown_gracefully;
pub use statistics::{print_batch_summary, print_error_statistics};
