//! Quark and UC drive.
//!
//! Both run the same "sharepage" backend: exchange the share id and passcode
//! for an `stoken`, then list the share's top-level directory with it. A share
//! that yields a token and a non-empty listing is valid.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::http::{parse_json, read_body, reject_server_error, rejected};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_ORIGIN, HEADER_REFERER};
use crate::error_handling::CheckError;
use crate::link::{Platform, ShareLink};

const QUARK_QUERY: &str = "pr=ucpro&fr=pc&uc_param_str=";
const UC_QUERY: &str = "entry=ft&fr=pc&pr=UCBrowser";
const SHORT_ID_PREFIX: &str = "qoark:";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TokenResponse {
    code: i64,
    message: String,
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TokenData {
    stoken: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DetailResponse {
    code: i64,
    message: String,
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DetailData {
    list: Vec<serde_json::Value>,
}

/// Checker for the Quark/UC sharepage API.
pub struct SharePageChecker {
    platform: Platform,
    client: Arc<reqwest::Client>,
    token_base: String,
    detail_base: String,
    query: &'static str,
    origin: &'static str,
}

impl SharePageChecker {
    pub fn quark(client: Arc<reqwest::Client>, token_base: &str, detail_base: &str) -> Self {
        Self {
            platform: Platform::Quark,
            client,
            token_base: token_base.trim_end_matches('/').to_string(),
            detail_base: detail_base.trim_end_matches('/').to_string(),
            query: QUARK_QUERY,
            origin: "https://pan.quark.cn",
        }
    }

    pub fn uc(client: Arc<reqwest::Client>, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            platform: Platform::Uc,
            client,
            token_base: base.clone(),
            detail_base: base,
            query: UC_QUERY,
            origin: "https://drive.uc.cn",
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let (share_id, password) = match link.share_id.strip_prefix(SHORT_ID_PREFIX) {
            Some(_) => self.resolve_short_link(link).await?,
            None => (link.share_id.clone(), link.password.clone()),
        };

        let stoken = match self.fetch_token(&share_id, password.as_deref()).await? {
            Ok(stoken) => stoken,
            Err(verdict) => return Ok(verdict),
        };
        self.list_root(&share_id, &stoken).await
    }

    /// Follows a short-domain link to the canonical share page.
    async fn resolve_short_link(
        &self,
        link: &ShareLink,
    ) -> Result<(String, Option<String>), CheckError> {
        let response = self.client.get(&link.url).send().await?;
        let (share_id, password) = share_from_url(response.url())?;
        Ok((share_id, password.or_else(|| link.password.clone())))
    }

    /// `Ok(Err(verdict))` when the platform already answered the question.
    async fn fetch_token(
        &self,
        share_id: &str,
        password: Option<&str>,
    ) -> Result<Result<String, Verdict>, CheckError> {
        let url = format!(
            "{}/1/clouddrive/share/sharepage/token?{}",
            self.token_base, self.query
        );
        let body = json!({
            "pwd_id": share_id,
            "passcode": password.unwrap_or_default(),
            "support_visit_limit_private_share": true,
        });
        let response = self
            .client
            .post(url)
            .header(HEADER_ORIGIN, self.origin)
            .header(HEADER_REFERER, format!("{}/", self.origin))
            .json(&body)
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let token: TokenResponse = parse_json(&text)?;

        if token.code != 0 {
            return Ok(Err(rejected(&token.message, "分享链接失效或不存在")));
        }
        match token.data.and_then(|d| d.stoken).filter(|s| !s.is_empty()) {
            Some(stoken) => Ok(Ok(stoken)),
            None => Ok(Err(Verdict::invalid("分享链接无效：未获取到访问令牌"))),
        }
    }

    async fn list_root(&self, share_id: &str, stoken: &str) -> Result<Verdict, CheckError> {
        let url = format!(
            "{}/1/clouddrive/share/sharepage/detail?{}",
            self.detail_base, self.query
        );
        let response = self
            .client
            .get(url)
            .query(&[
                ("pwd_id", share_id),
                ("stoken", stoken),
                ("pdir_fid", "0"),
                ("force", "0"),
                ("_page", "1"),
                ("_size", "50"),
            ])
            .header(HEADER_ORIGIN, self.origin)
            .header(HEADER_REFERER, format!("{}/", self.origin))
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let detail: DetailResponse = parse_json(&text)?;

        if detail.code != 0 {
            return Ok(rejected(&detail.message, "分享链接失效或不存在"));
        }
        match detail.data {
            Some(data) if !data.list.is_empty() => Ok(Verdict::valid()),
            _ => Ok(Verdict::invalid("分享链接无效：文件列表为空")),
        }
    }
}

/// Pulls the share id and `pwd` out of a resolved `pan.quark.cn/s/{id}` URL.
fn share_from_url(url: &Url) -> Result<(String, Option<String>), CheckError> {
    let host = url.host_str().unwrap_or_default();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match (host, segments.as_slice()) {
        ("pan.quark.cn", ["s", id, ..]) => {
            let password = url
                .query_pairs()
                .find(|(k, _)| k == "pwd")
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty());
            Ok((id.to_string(), password))
        }
        _ => Err(CheckError::Redirect(format!(
            "short link resolved to {url}, not a share page"
        ))),
    }
}

#[async_trait]
impl LinkChecker for SharePageChecker {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!(
            "{} {} -> {:?}",
            self.platform,
            link.share_id,
            verdict.status
        );
        verdict
    }
}
