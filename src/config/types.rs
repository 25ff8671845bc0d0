//! Configuration types.
//!
//! This module defines the library configuration struct plus the enums used for
//! command-line parsing of log settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::*;
use crate::error_handling::ConfigError;
use crate::link::Platform;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Base URLs of every platform API a checker talks to.
///
/// Production values point at the real share services. Tests point all of them
/// at a single mock server with [`PlatformEndpoints::all_at`].
#[derive(Debug, Clone)]
pub struct PlatformEndpoints {
    /// Quark share-page token API
    pub quark_token: String,
    /// Quark share-page detail API
    pub quark_detail: String,
    /// UC drive API (token and detail share one host)
    pub uc: String,
    /// Baidu netdisk web host
    pub baidu: String,
    /// Tianyi (189) cloud host
    pub tianyi: String,
    /// 123pan host
    pub pan123: String,
    /// 115 web API host
    pub pan115: String,
    /// Aliyun drive API host
    pub aliyun: String,
    /// Xunlei captcha/user service
    pub xunlei_user: String,
    /// Xunlei drive API
    pub xunlei_api: String,
    /// 139 mobile cloud share service
    pub mobile: String,
}

impl Default for PlatformEndpoints {
    fn default() -> Self {
        Self {
            quark_token: "https://drive-h.quark.cn".to_string(),
            quark_detail: "https://drive-pc.quark.cn".to_string(),
            uc: "https://pc-api.uc.cn".to_string(),
            baidu: "https://pan.baidu.com".to_string(),
            tianyi: "https://cloud.189.cn".to_string(),
            pan123: "https://www.123pan.com".to_string(),
            pan115: "https://webapi.115.com".to_string(),
            aliyun: "https://api.aliyundrive.com".to_string(),
            xunlei_user: "https://xluser-ssl.xunlei.com".to_string(),
            xunlei_api: "https://api-pan.xunlei.com".to_string(),
            mobile: "https://share-kd-njs.yun.139.com".to_string(),
        }
    }
}

impl PlatformEndpoints {
    /// Routes every platform to the same base URL.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            quark_token: base.clone(),
            quark_detail: base.clone(),
            uc: base.clone(),
            baidu: base.clone(),
            tianyi: base.clone(),
            pan123: base.clone(),
            pan115: base.clone(),
            aliyun: base.clone(),
            xunlei_user: base.clone(),
            xunlei_api: base.clone(),
            mobile: base,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct used by the library. It can be
/// constructed programmatically without any CLI dependencies.
///
/// # Examples
///
/// ```no_run
/// use pan_check::Config;
///
/// let config = Config {
///     max_concurrency: 10,
///     check_timeout_secs: 8,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Maximum concurrent link checks across all platforms (K)
    pub max_concurrency: usize,

    /// Maximum concurrent link checks against one platform
    pub per_platform_concurrency: usize,

    /// Requests per second allowed against one platform (0 disables)
    pub per_platform_rps: u32,

    /// Timeout for a single link check in seconds
    pub check_timeout_secs: u64,

    /// Timeout for a whole batch in seconds
    pub batch_timeout_secs: u64,

    /// Seconds between scheduler passes
    pub scheduler_interval_secs: u64,

    /// Consecutive pending outcomes before a tracked link expires
    pub max_attempts: u32,

    /// Consecutive identical valid/invalid outcomes before a link is settled
    pub required_confirmations: u32,

    /// Re-check valid links older than this many seconds (None disables)
    pub recheck_valid_after_secs: Option<u64>,

    /// Base delay before a pending link is re-checked, in seconds.
    /// Defaults to the scheduler interval; doubles on each further pending outcome.
    pub recheck_base_delay_secs: u64,

    /// Platforms checked when a request does not carry its own selection (None = all)
    pub selected_platforms: Option<Vec<Platform>>,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Platform API base URLs
    pub endpoints: PlatformEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            per_platform_concurrency: DEFAULT_PER_PLATFORM_CONCURRENCY,
            per_platform_rps: DEFAULT_PER_PLATFORM_RPS,
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT_SECS,
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
            scheduler_interval_secs: DEFAULT_SCHEDULER_INTERVAL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            recheck_valid_after_secs: None,
            recheck_base_delay_secs: DEFAULT_SCHEDULER_INTERVAL_SECS,
            selected_platforms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            endpoints: PlatformEndpoints::default(),
        }
    }
}

impl Config {
    /// Rejects values the engine cannot run with.
    ///
    /// Called once at startup so a bad configuration fails loudly instead of
    /// surfacing as odd per-request behaviour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.per_platform_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "per_platform_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.check_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "check_timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.batch_timeout_secs < self.check_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "batch_timeout_secs",
                reason: format!(
                    "must not be shorter than check_timeout_secs ({}s)",
                    self.check_timeout_secs
                ),
            });
        }
        if self.scheduler_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler_interval_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.required_confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "required_confirmations",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(selected) = &self.selected_platforms {
            if selected.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "selected_platforms",
                    reason: "an empty allowlist would exclude every link".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrency, 20);
        assert_eq!(config.check_timeout_secs, 15);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.required_confirmations, 1);
        assert!(config.selected_platforms.is_none());
        assert_eq!(config.db_path, PathBuf::from("./pan_check.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrency: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }

    #[test]
    fn test_validate_rejects_batch_shorter_than_check() {
        let config = Config {
            check_timeout_secs: 30,
            batch_timeout_secs: 10,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_empty_allowlist() {
        let config = Config {
            selected_platforms: Some(Vec::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoints_all_at_trims_trailing_slash() {
        let endpoints = PlatformEndpoints::all_at("http://127.0.0.1:9000/");
        assert_eq!(endpoints.quark_token, "http://127.0.0.1:9000");
        assert_eq!(endpoints.mobile, "http://127.0.0.1:9000");
    }
}
