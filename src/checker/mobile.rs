//! 139 mobile cloud (caiyun).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::http::{ambiguous, parse_json, read_body, reject_server_error};
use super::{LinkChecker, Verdict};
use crate::config::{HEADER_ORIGIN, HEADER_REFERER};
use crate::error_handling::CheckError;
use crate::link::{Platform, ShareLink};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutLinkResponse {
    // "0" on success; some gateways send it as a number.
    code: Value,
    desc: String,
    message: String,
}

pub struct MobileCloudChecker {
    client: Arc<reqwest::Client>,
    base: String,
}

impl MobileCloudChecker {
    pub fn new(client: Arc<reqwest::Client>, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, link: &ShareLink) -> Result<Verdict, CheckError> {
        let url = format!(
            "{}/yun-share/richlifeApp/devapp/IOutLink/getOutLinkInfoV6",
            self.base
        );
        let body = json!({
            "getOutLinkInfoReq": {
                "account": "",
                "linkID": link.share_id,
                "passwd": link.password.as_deref().unwrap_or_default(),
                "caSrt": 0,
                "coSrt": 0,
                "srtDr": 1,
                "bNum": 1,
                "pCaID": "root",
                "eNum": 200,
            },
            "commonAccountInfo": {"account": "", "accountType": 1},
        });
        let response = self
            .client
            .post(url)
            .header(HEADER_ORIGIN, "https://yun.139.com")
            .header(HEADER_REFERER, "https://yun.139.com/")
            .json(&body)
            .send()
            .await?;
        let (status, text) = read_body(response).await?;
        reject_server_error(status)?;
        let out_link: OutLinkResponse = parse_json(&text)?;
        Ok(verdict_for(&out_link))
    }
}

fn verdict_for(out_link: &OutLinkResponse) -> Verdict {
    let ok = match &out_link.code {
        Value::String(s) => s == "0",
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    };
    if ok {
        return Verdict::valid();
    }
    let message = if out_link.desc.is_empty() {
        &out_link.message
    } else {
        &out_link.desc
    };
    ambiguous(message)
}

#[async_trait]
impl LinkChecker for MobileCloudChecker {
    fn platform(&self) -> Platform {
        Platform::MobileCloud
    }

    async fn check(&self, link: &ShareLink) -> Verdict {
        let verdict = self.probe(link).await.unwrap_or_else(Verdict::from);
        log::debug!("mobile {} -> {:?}", link.share_id, verdict.status);
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{test_link, LinkStatus};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn check_with(body: Value) -> Verdict {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/yun-share/richlifeApp/devapp/IOutLink/getOutLinkInfoV6"))
            .and(body_partial_json(
                json!({"getOutLinkInfoReq": {"linkID": "2qiAbc", "passwd": "k9k9"}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let checker = MobileCloudChecker::new(Arc::new(reqwest::Client::new()), &server.uri());
        checker
            .check(&test_link(Platform::MobileCloud, "2qiAbc", Some("k9k9")))
            .await
    }

    #[tokio::test]
    async fn test_live_share() {
        let verdict = check_with(json!({"code": "0", "desc": "成功", "data": {}})).await;
        assert_eq!(verdict, Verdict::valid());
    }

    #[tokio::test]
    async fn test_dead_share() {
        let verdict = check_with(json!({"code": "9188", "desc": "外链不存在或已失效"})).await;
        assert_eq!(verdict.status, LinkStatus::Invalid);
        assert_eq!(verdict.reason.as_deref(), Some("外链不存在或已失效"));
    }

    #[tokio::test]
    async fn test_unclear_failure_is_pending() {
        let verdict = check_with(json!({"code": "500", "desc": "系统内部错误"})).await;
        assert_eq!(verdict.status, LinkStatus::Pending);
    }

    #[test]
    fn test_numeric_success_code() {
        let out_link = OutLinkResponse {
            code: json!(0),
            ..Default::default()
        };
        assert_eq!(verdict_for(&out_link).status, LinkStatus::Valid);
    }
}
