//! Request/response helpers shared by the platform checkers.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::Verdict;
use crate::config::{HTTP_STATUS_TOO_MANY_REQUESTS, MAX_REASON_LENGTH, MAX_RESPONSE_BODY_SIZE};
use crate::error_handling::{CheckError, ErrorType};

// Phrases platforms use when a share is gone for good.
const DEAD_MARKERS: &[&str] = &[
    "不存在",
    "失效",
    "过期",
    "取消",
    "删除",
    "违规",
    "封禁",
    "侵权",
    "not found",
    "expired",
    "cancel",
    "deleted",
];

// Phrases platforms use when they want us to slow down.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "频繁",
    "太快",
    "稍后再试",
    "验证码",
    "too many",
    "rate limit",
    "throttl",
];

/// Reads a response body, enforcing the size cap.
///
/// Returns the status alongside the text so callers can interpret error
/// bodies (several platforms report dead shares with a 4xx and a JSON code).
/// 429 is turned into `CheckError::RateLimited` here for every platform.
pub(crate) async fn read_body(response: Response) -> Result<(StatusCode, String), CheckError> {
    let status = response.status();
    if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
        return Err(CheckError::RateLimited(format!("HTTP {status}")));
    }
    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_BODY_SIZE {
            return Err(CheckError::UnexpectedResponse(format!(
                "response body too large ({len} bytes)"
            )));
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_BODY_SIZE {
        return Err(CheckError::UnexpectedResponse(format!(
            "response body too large ({} bytes)",
            bytes.len()
        )));
    }
    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Parses a JSON body, mapping failures to `CheckError::Decode`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, CheckError> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(80).collect();
        CheckError::Decode(format!("{e} (body: {preview})"))
    })
}

/// Treats 5xx as a transient platform failure.
pub(crate) fn reject_server_error(status: StatusCode) -> Result<(), CheckError> {
    if status.is_server_error() {
        return Err(CheckError::Status(status.as_u16()));
    }
    Ok(())
}

pub(crate) fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

pub(crate) fn is_dead_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    DEAD_MARKERS.iter().any(|m| lower.contains(m))
}

/// Verdict for an explicit platform error code.
///
/// The platform answered and said no, so this is invalid unless the message
/// asks us to back off.
pub(crate) fn rejected(message: &str, fallback: &str) -> Verdict {
    let message = message.trim();
    if is_rate_limit_message(message) {
        return Verdict::from(CheckError::RateLimited(message.to_string()));
    }
    if message.is_empty() {
        Verdict::invalid(fallback)
    } else {
        Verdict::invalid(message)
    }
}

/// Verdict for a response we can't map to a known code.
///
/// Only a message that clearly says the share is gone counts as invalid.
pub(crate) fn ambiguous(message: &str) -> Verdict {
    let message = message.trim();
    if is_rate_limit_message(message) {
        Verdict::from(CheckError::RateLimited(message.to_string()))
    } else if is_dead_message(message) {
        Verdict::invalid(message)
    } else if message.is_empty() {
        Verdict::pending("unexpected response", ErrorType::UnexpectedResponse)
    } else {
        Verdict::pending(message, ErrorType::UnexpectedResponse)
    }
}

pub(crate) fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= MAX_REASON_LENGTH {
        reason.to_string()
    } else {
        let mut truncated: String = reason.chars().take(MAX_REASON_LENGTH).collect();
        truncated.push('…');
        truncated
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
