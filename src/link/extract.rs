//! Candidate extraction from free-form text.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::LinkCandidate;
use crate::config::MAX_URL_LENGTH;

// Scheme (or protocol-relative) URLs may omit the path; bare host forms need one
// so that prose like "visit example.com" isn't picked up. Paths are printable
// ASCII, so text glued onto a URL ends it.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:(?:https?:)?//(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d{1,5})?(?:[/?#][!-~&&[^<>"']]*)?|(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d{1,5})?/[!-~&&[^<>"']]*)"#,
    )
    .expect("URL pattern is valid")
});

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:提取码|密码|访问码|验证码|passcode|password|pwd|code)\s*[:：=]?\s*([a-z0-9]{4,8})(?:[^a-z0-9]|$)",
    )
    .expect("access code pattern is valid")
});

const TRAILING_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"', '>', '。', '，', '；', '：', '！', '？',
    '）', '】', '」', '》',
];

/// Pulls share-link candidates out of free-form text, preserving input order.
///
/// A line with no URL yields nothing, unless it is a single printable-ASCII
/// token, which is treated as an attempted link that failed to parse. An
/// access code on the line after a URL is attached to that URL.
pub fn extract_candidates(text: &str) -> Vec<LinkCandidate> {
    let mut candidates: Vec<LinkCandidate> = Vec::new();
    // Index of the last URL candidate still waiting for a code on the next line.
    let mut awaiting_code: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let spans: Vec<(usize, usize)> = URL_PATTERN
            .find_iter(trimmed)
            .map(|m| (m.start(), m.start() + trim_trailing(m.as_str()).len()))
            .filter(|(start, end)| end > start)
            .collect();

        let code = find_code(trimmed, &spans);

        if spans.is_empty() {
            match (code, awaiting_code.take()) {
                (Some((_, code)), Some(index)) => {
                    candidates[index].password = Some(code);
                }
                (Some(_), None) => {}
                (None, _) => {
                    if is_bare_token(trimmed) {
                        candidates.push(LinkCandidate {
                            original: trimmed.to_string(),
                            url: None,
                            password: None,
                        });
                    }
                }
            }
            continue;
        }

        let first_index = candidates.len();
        for (start, end) in &spans {
            let raw = &trimmed[*start..*end];
            candidates.push(LinkCandidate {
                original: raw.to_string(),
                url: normalize_url(raw),
                password: None,
            });
        }

        awaiting_code = None;
        match code {
            Some((position, code)) => {
                let owner = spans
                    .iter()
                    .rposition(|(start, _)| *start < position)
                    .unwrap_or(0);
                candidates[first_index + owner].password = Some(code);
            }
            None => awaiting_code = Some(candidates.len() - 1),
        }
    }

    candidates
}

fn trim_trailing(raw: &str) -> &str {
    raw.trim_end_matches(TRAILING_PUNCTUATION)
}

/// Finds an access code outside of the URL spans, returning its byte position.
fn find_code(line: &str, spans: &[(usize, usize)]) -> Option<(usize, String)> {
    CODE_PATTERN.captures_iter(line).find_map(|caps| {
        let whole = caps.get(0)?;
        let inside_url = spans
            .iter()
            .any(|(start, end)| whole.start() < *end && whole.start() >= *start);
        if inside_url {
            return None;
        }
        caps.get(1).map(|m| (whole.start(), m.as_str().to_string()))
    })
}

fn is_bare_token(line: &str) -> bool {
    line.chars().all(|c| c.is_ascii_graphic())
}

/// Adds a scheme where one is missing and rejects oversized URLs.
fn normalize_url(raw: &str) -> Option<String> {
    if raw.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            raw.len(),
            MAX_URL_LENGTH,
            raw.chars().take(50).collect::<String>()
        );
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    let normalized = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https://{raw}")
    };

    match url::Url::parse(&normalized) {
        Ok(_) => Some(normalized),
        Err(_) => {
            warn!("Skipping invalid URL: {raw}");
            None
        }
    }
}
