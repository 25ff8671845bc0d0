//! 115 cloud.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::http::{is_rate_limit_message, parse_json, read_body, reject_server_error, rejected};
use super::{LinkChecker, Verdict};
use crate::config::HEADER_REFERER;
use crate::error_handling::CheckError;
use crate::link::{Platform, ShareLink};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SnapResponse {
    state: bool,
    error: String,
    errno: i64,
    data: Option<SnapData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SnapData {
    shareinfo: Option<ShareInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ShareInfo {
    forbid_reason: String,
}

pub struct Pan115Checker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl Pan115Checker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let url = format!("{}/share/snap", self.base);
        let response = self
            .client
            .get(url)
            .query(&[
                ("share_code", link.share_id.as_str()),
                ("receive_code", link.password.as_deref().unwrap_or_default()),
                ("offset", "0"),
                ("limit", "20"),
                ("cid", ""),
            ])
            .header(HEADER_REFERER, "https://115.com/")
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let snap: SnapResponse = parse_json(&text)?;
        Ok(verdict_for(&snap, link.password.is_some()))
    }
}

fn verdict_for(snap: &SnapResponse, has_code: bool) -> Verdict {
    if snap.state {
        let forbid = snap
            .data
            .as_ref()
            .and_then(|d| d.shareinfo.as_ref())
            .map(|s| s.forbid_reason.trim())
            .unwrap_or_default();
        return if forbid.is_empty() {
            Verdict::valid()
        } else {
            Verdict::invalid(forbid)
        };
    }
    // The share exists but we were not given its receive code.
    if !has_code && snap.error.contains("访问码") && !is_rate_limit_message(&snap.error) {
        return Verdict::valid();
    }
    let fallback = format!("分享已失效 (errno {})", snap.errno);
    rejected(&snap.error, &fallback)
}

#[async_trait]
impl LinkChecker for Pan115Checker {
    fn platform(&self) -> Platform {
        Platform::Pan115
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("115 {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}
