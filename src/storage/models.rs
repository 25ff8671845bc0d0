//! Rows persisted by the result store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::link::{Platform, ShareLink};

/// Lifecycle state of a link under scheduled re-check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrackedStatus {
    Pending,
    Valid,
    Invalid,
    /// Gave up after too many consecutive pending outcomes.
    Expired,
}

impl TrackedStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A link the scheduler keeps re-checking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedLink {
    pub link: ShareLink,
    pub status: TrackedStatus,
    pub reason: Option<String>,
    #[serde(skip)]
    pub last_duration: Option<Duration>,
    /// Consecutive pending outcomes.
    pub attempts: u32,
    /// Consecutive identical valid/invalid outcomes.
    pub confirmations: u32,
    pub first_seen: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub next_check: Option<DateTime<Utc>>,
}

impl TrackedLink {
    /// A never-checked link, due immediately.
    pub fn new(link: ShareLink, now: DateTime<Utc>) -> Self {
        Self {
            link,
            status: TrackedStatus::Pending,
            reason: None,
            last_duration: None,
            attempts: 0,
            confirmations: 0,
            first_seen: now,
            last_checked: None,
            next_check: Some(now),
        }
    }

    /// Store key (`platform:id[#code]`).
    pub fn key(&self) -> String {
        self.link.canonical_key().to_string()
    }

    pub fn summary(&self) -> TrackedLinkSummary {
        TrackedLinkSummary {
            platform: self.link.platform,
            url: self.link.url.clone(),
            status: self.status,
            reason: self.reason.clone(),
            last_checked: self.last_checked,
            attempts: self.attempts,
            next_check: self.next_check,
        }
    }
}

/// Operator view of one tracked link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedLinkSummary {
    pub platform: Platform,
    pub url: String,
    pub status: TrackedStatus,
    pub reason: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub next_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// Counts gathered by one scheduler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Due links read from the store.
    pub links_count: usize,
    /// Links that came back from the orchestrator.
    pub checked_count: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub pending_count: usize,
    pub expired_count: usize,
}

/// One recorded scheduler pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskExecution {
    pub id: i64,
    pub status: ExecutionStatus,
    pub summary: PassSummary,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}
