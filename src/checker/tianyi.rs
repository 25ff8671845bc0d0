//! Tianyi (189) cloud.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::http::{ambiguous, parse_json, read_body, reject_server_error};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_REFERER, REASON_RATE_LIMITED};
use crate::error_handling::{CheckError, ErrorType};
use crate::link::{Platform, ShareLink};

// res_code values 189 returns for shares that no longer exist.
const DEAD_CODES: &[(&str, &str)] = &[
    ("ShareNotFound", "分享不存在"),
    ("ShareInfoNotFound", "分享不存在"),
    ("ShareNotFoundFlatDir", "分享不存在"),
    ("ShareExpired", "分享已过期"),
    ("ShareAuditNotPass", "分享审核未通过"),
    ("FileNotFound", "分享的文件已删除"),
    ("ShareDumpFileNotExist", "分享的文件已删除"),
];

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ShareInfoResponse {
    // Numeric 0 on success, a string code otherwise.
    res_code: Value,
    res_message: String,
}

pub struct TianyiChecker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl TianyiChecker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let url = format!(
            "{}/api/open/share/getShareInfoByCodeV2.action",
            self.base
        );
        let response = self
            .client
            .get(url)
            .query(&[("shareCode", link.share_id.as_str())])
            .header(reqwest::header::ACCEPT, "application/json;charset=UTF-8")
            .header("sign-type", "1")
            .header(
                HEADER_REFERER,
                format!("https://cloud.189.cn/web/share?code={}", link.share_id),
            )
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let info: ShareInfoResponse = parse_json(&text)?;
        Ok(verdict_for(&info))
    }
}

fn verdict_for(info: &ShareInfoResponse) -> Verdict {
    let code = match &info.res_code {
        Value::Number(n) if n.as_i64() == Some(0) => return Verdict::valid(),
        Value::String(s) if s == "0" => return Verdict::valid(),
        Value::String(s) => s.as_str(),
        Value::Null => return ambiguous(&info.res_message),
        _ => "",
    };
    if let Some((_, reason)) = DEAD_CODES.iter().find(|(c, _)| *c == code) {
        return Verdict::invalid(*reason);
    }
    match code {
        "ShareAuditWaiting" => Verdict::pending("分享审核中", ErrorType::UnexpectedResponse),
        "ApiRateLimit" | "RequestTooFrequent" => {
            Verdict::pending(REASON_RATE_LIMITED, ErrorType::HttpRequestTooManyRequests)
        }
        _ if info.res_message.is_empty() => Verdict::pending(
            format!("unexpected res_code {}", info.res_code),
            ErrorType::UnexpectedResponse,
        ),
        _ => ambiguous(&info.res_message),
    }
}

#[async_trait]
impl LinkChecker for TianyiChecker {
    fn platform(&self) -> Platform {
        Platform::Tianyi
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("tianyi {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
