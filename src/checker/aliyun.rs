//! Aliyun drive (alipan).
//!
//! The anonymous share endpoint returns share metadata on success and a
//! `{code, message}` error body with a 4xx status otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http::{ambiguous, parse_json, read_body, reject_server_error};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_ORIGIN, HEADER_REFERER, REASON_RATE_LIMITED};
use crate::error_handling::{CheckError, ErrorType};
use crate::link::{Platform, ShareLink};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ShareResponse {
    file_count: Option<u64>,
    share_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ErrorResponse {
    code: String,
    message: String,
}

pub struct AliyunChecker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl AliyunChecker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let url = format!(
            "{}/adrive/v3/share_link/get_share_by_anonymous",
            self.base
        );
        let response = self
            .client
            .post(url)
            .query(&[("share_id", link.share_id.as_str())])
            .header(HEADER_ORIGIN, "https://www.alipan.com")
            .header(HEADER_REFERER, "https://www.alipan.com/")
            .json(&json!({ "share_id": link.share_id }))
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;

        if status.is_success() {
            let share: ShareResponse = parse_json(&text)?;
            return Ok(match share.file_count {
                Some(0) => Verdict::invalid("分享内容为空"),
                _ => {
                    log::trace!("aliyun share {:?} is live", share.share_name);
                    Verdict::valid()
                }
            });
        }
        let error: ErrorResponse = parse_json(&text)?;
        Ok(verdict_for_code(&error.code, &error.message))
    }
}

fn verdict_for_code(code: &str, message: &str) -> Verdict {
    match code {
        "ShareLink.Cancelled" => Verdict::invalid("分享已取消"),
        "ShareLink.Expired" => Verdict::invalid("链接已过期"),
        "ShareLink.Forbidden" => Verdict::invalid("分享已被封禁"),
        "NotFound.ShareLink" | "ShareLink.NotFound" | "InvalidParameter.ShareId" => {
            Verdict::invalid("分享不存在")
        }
        "NotFound.File" | "ShareLink.DeletedFile" => Verdict::invalid("分享的文件已删除"),
        "TooManyRequests" | "Throttling" | "QuotaExhausted.Drive" => {
            Verdict::pending(REASON_RATE_LIMITED, ErrorType::HttpRequestTooManyRequests)
        }
        "" => ambiguous(message),
        other => Verdict::pending(
            format!("{other}: {message}"),
            ErrorType::UnexpectedResponse,
        ),
    }
}

#[async_trait]
impl LinkChecker for AliyunChecker {
    fn platform(&self) -> Platform {
        Platform::Aliyun
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("aliyun {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
