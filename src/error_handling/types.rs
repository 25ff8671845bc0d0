//! Error type definitions.
//!
//! Typed errors for startup, storage, configuration and the internals of a
//! platform check, plus the `ErrorType` categories counted during a batch.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::link::Platform;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt row for {key}: {reason}")]
    CorruptRow { key: String, reason: String },
}

/// Configuration problems detected at startup.
///
/// These are programmer or operator errors and are never produced per request.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A numeric or list setting is out of range.
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The classifier recognizes a platform that has no registered checker.
    #[error("No checker registered for platform {0}")]
    MissingChecker(Platform),
}

/// Failure inside a single platform check.
///
/// Never escapes a checker: every variant is folded into a pending verdict.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The platform did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] ReqwestError),

    /// The platform answered with a status we can't interpret.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The platform told us to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The body wasn't the JSON/HTML shape we expected.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The body parsed but carried no usable verdict.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A short link could not be resolved to a share page.
    #[error("redirect failed: {0}")]
    Redirect(String),
}

impl CheckError {
    /// Maps the failure onto the counter category it is reported under.
    pub fn error_type(&self) -> ErrorType {
        match self {
            CheckError::Timeout => ErrorType::HttpRequestTimeoutError,
            CheckError::Http(e) => super::categorize_reqwest_error(e),
            CheckError::Status(status) => super::categorize_status(*status),
            CheckError::RateLimited(_) => ErrorType::HttpRequestTooManyRequests,
            CheckError::Decode(_) => ErrorType::HttpRequestDecodeError,
            CheckError::UnexpectedResponse(_) => ErrorType::UnexpectedResponse,
            CheckError::Redirect(_) => ErrorType::HttpRequestRedirectError,
        }
    }
}

/// Types of errors that can occur while checking a link.
///
/// Every one of these ends in a pending result; the counters tell operators
/// why links are stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // HTTP/Network errors
    HttpRequestBuilderError,
    HttpRequestRedirectError,
    HttpRequestTimeoutError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestDecodeError,
    HttpRequestOtherError,
    HttpRequestTooManyRequests,
    HttpRequestBotDetectionError, // 403 Forbidden - typically bot detection
    HttpRequestNotFound,
    HttpRequestServerError,
    // Platform payload errors
    UnexpectedResponse,
    // Orchestrator-level outcomes
    CheckTimeout,
    BatchTimeout,
    CheckerPanic,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestDecodeError => "HTTP request decode error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
            ErrorType::HttpRequestTooManyRequests => "Too many requests",
            ErrorType::HttpRequestBotDetectionError => "Bot detection (403 Forbidden)",
            ErrorType::HttpRequestNotFound => "Not Found (404)",
            ErrorType::HttpRequestServerError => "Server error (5xx)",
            ErrorType::UnexpectedResponse => "Unexpected platform response",
            ErrorType::CheckTimeout => "Check timeout",
            ErrorType::BatchTimeout => "Batch timeout",
            ErrorType::CheckerPanic => "Checker panicked",
        }
    }
}
