//! Baidu netdisk.
//!
//! With an extraction code the share is verified through `share/verify`, which
//! answers with an `errno`. Without one the public share page is fetched and
//! read for the error banners Baidu renders on dead shares.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;

use super::http::{now_millis, parse_json, read_body, reject_server_error};
use super::{LinkChecker, Verdict};
use crate::config::{ACCEPT_HTML, HEADER_REFERER, REASON_RATE_LIMITED};
use crate::error_handling::{CheckError, ErrorType};
use crate::link::{Platform, ShareLink};

// Banners on the share page of a removed share, paired with the reason we report.
const DEAD_PAGE_MARKERS: &[(&str, &str)] = &[
    ("分享的文件已经被删除", "分享的文件已经被删除"),
    ("分享的文件已经被取消", "分享的文件已经被取消"),
    ("此链接分享内容可能因为涉及侵权", "分享内容涉及侵权，已被屏蔽"),
    ("分享内容可能因为涉及", "分享内容违规，已被屏蔽"),
    ("链接不存在", "链接不存在"),
    ("分享已过期", "分享已过期"),
    ("啊哦，你来晚了", "分享的文件已经被取消"),
];

const LOCKED_PAGE_MARKERS: &[&str] = &["请输入提取码", "提取文件"];
const LIVE_PAGE_MARKERS: &[&str] = &["yunData", "window.locals", "file_list", "server_filename"];
const THROTTLE_PAGE_MARKERS: &[&str] = &["访问过于频繁", "请求过于频繁", "安全验证"];

static TEXT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title, .share-error-left, .error-reason, #share_nofound_des, body")
        .expect("Failed to parse share page selector - this is a bug")
});

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VerifyResponse {
    errno: i64,
    err_msg: String,
}

pub struct BaiduChecker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl BaiduChecker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        match link.password.as_deref() {
            Some(code) => self.verify(&link.share_id, code).await,
            None => self.inspect_page(&link.share_id).await,
        }
    }

    async fn verify(&self, surl: &str, code: &str) -> Result<Verdict, CheckError> {
        let url = format!("{}/share/verify", self.base);
        let timestamp = now_millis().to_string();
        let response = self
            .client
            .post(url)
            .query(&[
                ("surl", surl),
                ("t", timestamp.as_str()),
                ("channel", "chunlei"),
                ("web", "1"),
                ("clienttype", "0"),
            ])
            .header(HEADER_REFERER, format!("{}/share/init?surl={surl}", self.base))
            .form(&[("pwd", code), ("vcode", ""), ("vcode_str", "")])
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let verify: VerifyResponse = parse_json(&text)?;
        Ok(verdict_for_errno(verify.errno, &verify.err_msg))
    }

    async fn inspect_page(&self, surl: &str) -> Result<Verdict, CheckError> {
        let url = format!("{}/s/1{surl}", self.base);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_HTML)
            .send()
            .await?;
        // A code-protected share redirects to share/init.
        if response.url().path().contains("/share/init") {
            return Ok(Verdict::valid());
        }
        let (status, html) = read_body(response).await?;
        reject_server_error(status)?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Verdict::invalid("链接不存在"));
        }
        Ok(verdict_for_page(&html))
    }
}

fn verdict_for_errno(errno: i64, message: &str) -> Verdict {
    match errno {
        0 => Verdict::valid(),
        -9 | -12 => Verdict::invalid("提取码错误"),
        -62 | -19 => Verdict::pending(REASON_RATE_LIMITED, ErrorType::HttpRequestTooManyRequests),
        2 | 105 => Verdict::invalid("链接格式错误或分享不存在"),
        -7 | 115 | 117 | 145 => Verdict::invalid("分享已失效"),
        other => {
            let detail = if message.is_empty() {
                format!("unexpected errno {other}")
            } else {
                format!("errno {other}: {message}")
            };
            Verdict::pending(detail, ErrorType::UnexpectedResponse)
        }
    }
}

/// Reads the share page text for dead/locked/live signals.
fn verdict_for_page(html: &str) -> Verdict {
    let document = Html::parse_document(html);
    let text: String = document
        .select(&TEXT_SELECTOR)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ");

    if let Some((_, reason)) = DEAD_PAGE_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(marker))
    {
        return Verdict::invalid(*reason);
    }
    if THROTTLE_PAGE_MARKERS.iter().any(|m| text.contains(m)) {
        return Verdict::pending(REASON_RATE_LIMITED, ErrorType::HttpRequestTooManyRequests);
    }
    if LOCKED_PAGE_MARKERS.iter().any(|m| text.contains(m))
        || LIVE_PAGE_MARKERS.iter().any(|m| html.contains(m))
    {
        return Verdict::valid();
    }
    Verdict::pending("unrecognized share page", ErrorType::UnexpectedResponse)
}

#[async_trait]
impl LinkChecker for BaiduChecker {
    fn platform(&self) -> Platform {
        Platform::Baidu
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("baidu {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
