//! Status transitions and due-ness for tracked links.
//!
//! Pure functions of (previous row, new result, clock) so the lifecycle can be
//! tested without a store or a network.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_retry::strategy::ExponentialBackoff;

use crate::checker::LinkStatus;
use crate::config::{Config, RECHECK_MAX_DELAY};
use crate::orchestrator::CheckResult;
use crate::storage::{TrackedLink, TrackedStatus};

/// Knobs controlling how long links stay under re-check.
#[derive(Debug, Clone)]
pub struct RecheckPolicy {
    /// Consecutive pending outcomes before a link expires.
    pub max_attempts: u32,
    /// Consecutive identical valid/invalid outcomes before a link is settled.
    pub required_confirmations: u32,
    /// Delay after the first pending outcome; doubles after each further one.
    pub base_delay: Duration,
    /// Settled valid links are re-checked after this long.
    pub recheck_valid_after: Option<Duration>,
}

impl RecheckPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            required_confirmations: config.required_confirmations,
            base_delay: Duration::from_secs(config.recheck_base_delay_secs),
            recheck_valid_after: config.recheck_valid_after_secs.map(Duration::from_secs),
        }
    }

    /// Wait before re-checking a link that has been pending `attempts` times.
    pub fn backoff(&self, attempts: u32) -> Duration {
        #[allow(clippy::cast_possible_truncation)]
        let half_base_ms = (self.base_delay.as_millis() / 2) as u64;
        // 2^n * base/2 == base, 2*base, 4*base, ...
        ExponentialBackoff::from_millis(2)
            .factor(half_base_ms)
            .max_delay(RECHECK_MAX_DELAY)
            .nth(attempts.saturating_sub(1) as usize)
            .unwrap_or(RECHECK_MAX_DELAY)
    }

    /// Folds a new check result into the link's tracked state.
    pub fn apply(&self, previous: Option<&TrackedLink>, result: &CheckResult) -> TrackedLink {
        let now = result.checked_at;
        let mut next = match previous {
            Some(prev) => prev.clone(),
            None => TrackedLink::new(result.link.clone(), now),
        };
        next.link = result.link.clone();
        next.reason = result.reason.clone();
        next.last_duration = Some(result.duration);
        next.last_checked = Some(now);

        match result.status {
            LinkStatus::Pending => {
                next.attempts = next.attempts.saturating_add(1);
                next.confirmations = 0;
                if next.attempts >= self.max_attempts {
                    next.status = TrackedStatus::Expired;
                    next.next_check = None;
                } else {
                    next.status = TrackedStatus::Pending;
                    next.next_check = Some(shift(now, self.backoff(next.attempts)));
                }
            }
            LinkStatus::Valid | LinkStatus::Invalid => {
                let status = if result.status == LinkStatus::Valid {
                    TrackedStatus::Valid
                } else {
                    TrackedStatus::Invalid
                };
                next.confirmations = match previous {
                    Some(prev) if prev.status == status => prev.confirmations.saturating_add(1),
                    _ => 1,
                };
                next.status = status;
                next.attempts = 0;
                next.next_check = if next.confirmations < self.required_confirmations {
                    Some(now)
                } else {
                    match (status, self.recheck_valid_after) {
                        (TrackedStatus::Valid, Some(after)) => Some(shift(now, after)),
                        _ => None,
                    }
                };
            }
        }
        next
    }

    /// Whether the scheduler should check `tracked` in a pass starting at `now`.
    pub fn is_due(&self, tracked: &TrackedLink, now: DateTime<Utc>) -> bool {
        let scheduled = tracked.next_check.map_or(true, |at| at <= now);
        let settled = tracked.confirmations >= self.required_confirmations;
        match tracked.status {
            TrackedStatus::Expired => false,
            TrackedStatus::Pending => scheduled,
            TrackedStatus::Invalid => !settled && scheduled,
            TrackedStatus::Valid if !settled => scheduled,
            TrackedStatus::Valid => match (self.recheck_valid_after, tracked.last_checked) {
                (Some(after), Some(last)) => shift(last, after) <= now,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

fn shift(from: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|by| from.checked_add_signed(by))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{test_link, Verdict};
    use crate::link::Platform;

    fn policy() -> RecheckPolicy {
        RecheckPolicy {
            max_attempts: 5,
            required_confirmations: 1,
            base_delay: Duration::from_secs(60),
            recheck_valid_after: None,
        }
    }

    fn result_at(verdict: Verdict, now: DateTime<Utc>) -> CheckResult {
        let mut result = CheckResult::from_verdict(
            test_link(Platform::Quark, "abc", None),
            verdict,
            Duration::from_millis(10),
        );
        result.checked_at = now;
        result
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_secs(60));
        assert_eq!(policy.backoff(2), Duration::from_secs(120));
        assert_eq!(policy.backoff(3), Duration::from_secs(240));
        assert_eq!(policy.backoff(30), RECHECK_MAX_DELAY);

        let immediate = RecheckPolicy {
            base_delay: Duration::ZERO,
            ..policy
        };
        assert_eq!(immediate.backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_pending_until_expired() {
        let policy = policy();
        let now = Utc::now();
        let mut tracked: Option<TrackedLink> = None;
        for attempt in 1..=5 {
            let next = policy.apply(
                tracked.as_ref(),
                &result_at(Verdict::pending("请求超时", crate::error_handling::ErrorType::CheckTimeout), now),
            );
            assert_eq!(next.attempts, attempt);
            if attempt < 5 {
                assert_eq!(next.status, TrackedStatus::Pending);
                assert!(next.next_check.unwrap() > now);
            } else {
                assert_eq!(next.status, TrackedStatus::Expired);
                assert!(!policy.is_due(&next, now + chrono::Duration::days(365)));
            }
            tracked = Some(next);
        }
    }

    #[test]
    fn test_invalid_is_settled_and_never_due() {
        let policy = policy();
        let now = Utc::now();
        let tracked = policy.apply(None, &result_at(Verdict::invalid("分享已删除"), now));
        assert_eq!(tracked.status, TrackedStatus::Invalid);
        assert_eq!(tracked.confirmations, 1);
        assert!(tracked.next_check.is_none());
        assert!(!policy.is_due(&tracked, now + chrono::Duration::days(365)));
    }

    #[test]
    fn test_terminal_result_resets_attempts() {
        let policy = policy();
        let now = Utc::now();
        let pending = policy.apply(
            None,
            &result_at(Verdict::pending("busy", crate::error_handling::ErrorType::UnexpectedResponse), now),
        );
        let valid = policy.apply(Some(&pending), &result_at(Verdict::valid(), now));
        assert_eq!(valid.attempts, 0);
        assert_eq!(valid.status, TrackedStatus::Valid);
        assert_eq!(valid.first_seen, pending.first_seen);
    }

    #[test]
    fn test_confirmations_required_before_settling() {
        let policy = RecheckPolicy {
            required_confirmations: 2,
            ..policy()
        };
        let now = Utc::now();
        let once = policy.apply(None, &result_at(Verdict::invalid("链接已过期"), now));
        assert!(policy.is_due(&once, now));

        let twice = policy.apply(Some(&once), &result_at(Verdict::invalid("链接已过期"), now));
        assert_eq!(twice.confirmations, 2);
        assert!(!policy.is_due(&twice, now));

        // A flip restarts the count
        let flipped = policy.apply(Some(&twice), &result_at(Verdict::valid(), now));
        assert_eq!(flipped.confirmations, 1);
        assert!(policy.is_due(&flipped, now));
    }

    #[test]
    fn test_valid_recheck_window() {
        let windowed = RecheckPolicy {
            recheck_valid_after: Some(Duration::from_secs(3600)),
            ..policy()
        };
        let now = Utc::now();
        let valid = windowed.apply(None, &result_at(Verdict::valid(), now));
        assert!(!windowed.is_due(&valid, now + chrono::Duration::minutes(30)));
        assert!(windowed.is_due(&valid, now + chrono::Duration::minutes(61)));

        let never = policy();
        assert!(!never.is_due(&valid, now + chrono::Duration::days(30)));
    }

    #[test]
    fn test_new_link_is_due() {
        let now = Utc::now();
        let tracked = TrackedLink::new(test_link(Platform::Baidu, "x", None), now);
        assert!(policy().is_due(&tracked, now));
    }
}
