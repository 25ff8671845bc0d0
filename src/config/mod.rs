//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, scheduling defaults)
//! - Default request headers for platform APIs
//! - The library `Config` struct and log option types

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{Config, LogFormat, LogLevel, PlatformEndpoints};
