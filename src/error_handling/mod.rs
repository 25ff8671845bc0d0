//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions (startup, storage, configuration, per-check)
//! - Categorization of transport errors into counters
//! - Processing statistics tracking
//!
//! Nothing in the checking path is fatal: `CheckError` values are folded into
//! pending verdicts and only counted here.

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, categorize_status};
pub use stats::ProcessingStats;
pub use types::{CheckError, ConfigError, DatabaseError, ErrorType, InitializationError};
