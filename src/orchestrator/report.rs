//! Per-link results and the batch report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::checker::{LinkStatus, Verdict};
use crate::error_handling::ErrorType;
use crate::link::ShareLink;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    #[allow(clippy::cast_possible_truncation)]
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Outcome of checking one link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub link: ShareLink,
    pub status: LinkStatus,
    pub reason: Option<String>,
    /// Time spent inside the checker (queueing excluded).
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub checked_at: DateTime<Utc>,
    /// Failure category behind a pending result.
    #[serde(skip)]
    pub error: Option<ErrorType>,
}

impl CheckResult {
    pub(crate) fn from_verdict(link: ShareLink, verdict: Verdict, duration: Duration) -> Self {
        Self {
            link,
            status: verdict.status,
            reason: verdict.reason,
            duration,
            checked_at: Utc::now(),
            error: verdict.error,
        }
    }
}

/// Everything a caller learns from one submitted batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub valid_links: Vec<CheckResult>,
    pub invalid_links: Vec<CheckResult>,
    pub pending_links: Vec<CheckResult>,
    /// Attempted links no platform recognized.
    pub invalid_format_count: usize,
    /// Recognized links dropped as repeats of an earlier one.
    pub duplicate_count: usize,
    /// Recognized links on platforms outside the requested selection.
    pub excluded_count: usize,
    #[serde(rename = "total_duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
}

impl BatchReport {
    /// Buckets results by status, keeping their relative order.
    pub(crate) fn from_results(results: Vec<CheckResult>) -> Self {
        let mut report = Self::default();
        for result in results {
            match result.status {
                LinkStatus::Valid => report.valid_links.push(result),
                LinkStatus::Invalid => report.invalid_links.push(result),
                LinkStatus::Pending => report.pending_links.push(result),
            }
        }
        report
    }

    /// Links that went through a checker.
    pub fn checked_count(&self) -> usize {
        self.valid_links.len() + self.invalid_links.len() + self.pending_links.len()
    }

    /// Every candidate the parser produced, accounted for exactly once.
    pub fn total_submitted(&self) -> usize {
        self.checked_count() + self.invalid_format_count + self.duplicate_count + self.excluded_count
    }

    /// All results in one list, valid first.
    pub fn results(&self) -> impl Iterator<Item = &CheckResult> {
        self.valid_links
            .iter()
            .chain(&self.invalid_links)
            .chain(&self.pending_links)
    }
}
