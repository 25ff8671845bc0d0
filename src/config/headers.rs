//! Browser-like request headers shared by every platform checker.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};

pub const HEADER_ORIGIN: &str = "origin";
pub const HEADER_REFERER: &str = "referer";

/// Accept header used for JSON share APIs
pub const ACCEPT_JSON: &str = "application/json, text/plain, */*";
/// Accept header used when fetching share pages
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Headers every platform request starts from.
///
/// User-Agent is set on the client itself; these cover the rest of what a
/// browser would send so the share APIs don't treat us as a scraper.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
