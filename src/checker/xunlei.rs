//! Xunlei (Thunder) cloud.
//!
//! The share API requires a captcha token, which an anonymous device can get
//! from the user service before asking about the share.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use super::http::{ambiguous, parse_json, read_body, reject_server_error};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_ORIGIN, HEADER_REFERER, REASON_RATE_LIMITED};
use crate::error_handling::{CheckError, ErrorType};
use crate::link::{Platform, ShareLink};

const CLIENT_ID: &str = "Xqp0kJBXWhwaTpB6";
const CLIENT_VERSION: &str = "1.45.0";
const SHARE_ACTION: &str = "get:/drive/v1/share";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CaptchaResponse {
    captcha_token: String,
    error: String,
    error_description: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ShareResponse {
    share_status: String,
    share_status_text: String,
    error: String,
    error_description: String,
}

pub struct XunleiChecker {
    client: Arc<reqwest::Client>,
    user_base: String,
    api_base: String,
}

impl XunleiChecker {
    pub fn new(client: Arc<reqwest::Client>, user_base: &str, api_base: &str) -> Self {
        Self {
            client,
            user_base: user_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let device_id = device_id();
        let captcha_token = self.captcha_token(&device_id).await?;

        let url = format!("{}/drive/v1/share", self.api_base);
        let response = self
            .client
            .get(url)
            .query(&[
                ("share_id", link.share_id.as_str()),
                ("pass_code", link.password.as_deref().unwrap_or_default()),
                ("limit", "100"),
                ("pass_code_token", ""),
                ("page_token", ""),
                ("thumbnail_size", "SIZE_SMALL"),
            ])
            .header("x-captcha-token", captcha_token)
            .header("x-client-id", CLIENT_ID)
            .header("x-device-id", &device_id)
            .header(HEADER_ORIGIN, "https://pan.xunlei.com")
            .header(HEADER_REFERER, "https://pan.xunlei.com/")
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let share: ShareResponse = parse_json(&text)?;
        Ok(verdict_for(&share))
    }

    async fn captcha_token(&self, device_id: &str) -> Result<String, CheckError> {
        let url = format!("{}/v1/shield/captcha/init", self.user_base);
        let body = json!({
            "client_id": CLIENT_ID,
            "action": SHARE_ACTION,
            "device_id": device_id,
            "meta": {
                "username": "",
                "phone_number": "",
                "email": "",
                "package_name": "pan.xunlei.com",
                "client_version": CLIENT_VERSION,
                "captcha_sign": "",
                "timestamp": "",
                "user_id": "0",
            },
        });
        let response = self.client.post(url).json(&body).send().await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let captcha: CaptchaResponse = parse_json(&text)?;
        if captcha.captcha_token.is_empty() {
            let detail = if captcha.error_description.is_empty() {
                captcha.error
            } else {
                captcha.error_description
            };
            return Err(CheckError::RateLimited(format!("captcha init failed: {detail}")));
        }
        Ok(captcha.captcha_token)
    }
}

fn device_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn verdict_for(share: &ShareResponse) -> Verdict {
    match share.share_status.as_str() {
        "OK" | "PASS_CODE_EMPTY" => Verdict::valid(),
        "PASS_CODE_ERROR" => Verdict::invalid("提取码错误"),
        "EXPIRED" => Verdict::invalid("链接已过期"),
        "DELETED" => Verdict::invalid("分享已删除"),
        "NOT_FOUND" => Verdict::invalid("分享不存在"),
        "SENSITIVE_RESOURCE" | "SENSITIVE_WORD" => Verdict::invalid("分享内容违规"),
        "" => match share.error.as_str() {
            "captcha_invalid" | "captcha_required" | "too_many_requests" | "rate_limit" => {
                Verdict::pending(REASON_RATE_LIMITED, ErrorType::HttpRequestTooManyRequests)
            }
            _ => ambiguous(&share.error_description),
        },
        other => {
            let text = if share.share_status_text.is_empty() {
                other
            } else {
                share.share_status_text.as_str()
            };
            ambiguous(text)
        }
    }
}

#[async_trait]
impl LinkChecker for XunleiChecker {
    fn platform(&self) -> Platform {
        Platform::Xunlei
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("xunlei {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
