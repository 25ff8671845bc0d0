//! Platform checkers.
//!
//! One `LinkChecker` per platform, each encapsulating how to ask that platform
//! whether a share is still alive. Checkers never return errors: every failure
//! mode is folded into a [`Verdict`], with anything we can't be sure about
//! reported as pending.

mod aliyun;
mod baidu;
mod http;
mod mobile;
mod pan115;
mod pan123;
mod registry;
mod sharepage;
mod tianyi;
mod xunlei;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::config::{REASON_RATE_LIMITED, REASON_TIMEOUT};
use crate::error_handling::{CheckError, ErrorType};
use crate::link::{Platform, ShareLink};

pub use aliyun::AliyunChecker;
pub use baidu::BaiduChecker;
pub use mobile::MobileCloudChecker;
pub use pan115::Pan115Checker;
pub use pan123::Pan123Checker;
pub use registry::CheckerRegistry;
pub use sharepage::SharePageChecker;
pub use tianyi::TianyiChecker;
pub use xunlei::XunleiChecker;

/// Outcome class of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// The share is reachable.
    Valid,
    /// The platform confirmed the share is gone.
    Invalid,
    /// No confident answer (timeout, throttling, odd response). Re-check later.
    Pending,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Invalid => "invalid",
            LinkStatus::Pending => "pending",
        }
    }
}

/// What a checker concluded about one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: LinkStatus,
    pub reason: Option<String>,
    /// Failure category behind a pending verdict, for statistics.
    pub error: Option<ErrorType>,
}

impl Verdict {
    pub fn valid() -> Self {
        Self {
            status: LinkStatus::Valid,
            reason: None,
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            status: LinkStatus::Invalid,
            reason: Some(http::truncate_reason(&reason.into())),
            error: None,
        }
    }

    pub fn pending(reason: impl Into<String>, error: ErrorType) -> Self {
        Self {
            status: LinkStatus::Pending,
            reason: Some(http::truncate_reason(&reason.into())),
            error: Some(error),
        }
    }
}

impl From<CheckError> for Verdict {
    fn from(err: CheckError) -> Self {
        let error = err.error_type();
        let reason = match &err {
            CheckError::Timeout => REASON_TIMEOUT.to_string(),
            CheckError::Http(e) if e.is_timeout() => REASON_TIMEOUT.to_string(),
            CheckError::RateLimited(_) => REASON_RATE_LIMITED.to_string(),
            other => format!("检测失败: {other}"),
        };
        Verdict::pending(reason, error)
    }
}

/// Capability every platform checker provides.
///
/// Implementations must bound their own network time and must never panic or
/// propagate transport errors; see [`Verdict`].
#[async_trait]
pub trait LinkChecker: Send + Sync {
    /// Platform this checker answers for.
    fn platform(&self) -> Platform;

    /// Asks the platform whether `link` is still retrievable.
    async fn check(&self, link: &ShareLink) -> Verdict;
}

#[cfg(test)]
pub(crate) fn test_link(platform: Platform, share_id: &str, password: Option<&str>) -> ShareLink {
    let url = format!("https://share.example/{}/{share_id}", platform.as_str());
    ShareLink {
        platform,
        share_id: share_id.to_string(),
        password: password.map(str::to_string),
        url: url.clone(),
        original: url,
    }
}
