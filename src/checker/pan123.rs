//! 123pan.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::http::{parse_json, read_body, reject_server_error, rejected};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_ORIGIN, HEADER_REFERER};
use crate::error_handling::CheckError;
use crate::link::{Platform, ShareLink};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ShareInfoResponse {
    code: i64,
    message: String,
    data: Option<ShareInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ShareInfo {
    expired: bool,
    share_key: String,
}

pub struct Pan123Checker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl Pan123Checker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let url = format!("{}/api/share/info", self.base);
        let response = self
            .client
            .get(url)
            .query(&[("shareKey", link.share_id.as_str())])
            .header("platform", "web")
            .header("App-Version", "3")
            .header(HEADER_ORIGIN, "https://www.123pan.com")
            .header(HEADER_REFERER, format!("https://www.123pan.com/s/{}", link.share_id))
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let info: ShareInfoResponse = parse_json(&text)?;

        if info.code != 0 {
            return Ok(rejected(&info.message, "分享不存在"));
        }
        match info.data {
            Some(data) if data.expired => Ok(Verdict::invalid("链接已过期")),
            Some(data) => {
                log::trace!("123pan share {} is live", data.share_key);
                Ok(Verdict::valid())
            }
            None => Err(CheckError::UnexpectedResponse(
                "share info without data".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LinkChecker for Pan123Checker {
    fn platform(&self) -> Platform {
        Platform::Pan123
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("123pan {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
