//! Platform classification by host and path signature.

use url::Url;

use super::{ClassifiedLink, LinkCandidate, Platform, ShareLink};

const PAN123_HOSTS: &[&str] = &[
    "123pan.com",
    "123pan.cn",
    "123684.com",
    "123685.com",
    "123865.com",
    "123912.com",
    "123592.com",
];

/// Host used by Quark's short links. The share id only becomes known after
/// following the redirect, so these keep a distinct key namespace.
pub(crate) const QUARK_SHORT_HOST: &str = "pan.qoark.cn";

/// Maps a candidate to its platform and share id.
///
/// Pure: no network access and no clock, so the same URL always yields the
/// same classification.
pub fn classify(candidate: LinkCandidate) -> ClassifiedLink {
    let Some(parsed) = candidate.url.as_deref().and_then(|u| Url::parse(u).ok()) else {
        return ClassifiedLink::Unrecognized(candidate);
    };
    let Some(host) = parsed.host_str().map(|h| h.to_ascii_lowercase()) else {
        return ClassifiedLink::Unrecognized(candidate);
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let Some((platform, share_id)) = match_platform(host, &parsed) else {
        return ClassifiedLink::Unrecognized(candidate);
    };

    let password = url_password(platform, &parsed).or_else(|| candidate.password.clone());
    ClassifiedLink::Recognized(ShareLink {
        platform,
        share_id,
        password,
        url: parsed.to_string(),
        original: candidate.original,
    })
}

fn match_platform(host: &str, url: &Url) -> Option<(Platform, String)> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "pan.quark.cn" => share_segment(&segments).map(|id| (Platform::Quark, id)),
        QUARK_SHORT_HOST => {
            share_segment(&segments).map(|id| (Platform::Quark, format!("qoark:{id}")))
        }
        "drive.uc.cn" | "fast.uc.cn" => share_segment(&segments).map(|id| (Platform::Uc, id)),
        "pan.baidu.com" | "yun.baidu.com" => baidu_surl(&segments, url).map(|id| (Platform::Baidu, id)),
        "cloud.189.cn" | "h5.cloud.189.cn" => {
            tianyi_code(&segments, url).map(|id| (Platform::Tianyi, id))
        }
        "115.com" | "115cdn.com" | "anxia.com" => {
            share_segment(&segments).map(|id| (Platform::Pan115, id))
        }
        "alipan.com" | "aliyundrive.com" => {
            share_segment(&segments).map(|id| (Platform::Aliyun, id))
        }
        "pan.xunlei.com" => share_segment(&segments).map(|id| (Platform::Xunlei, id)),
        "caiyun.139.com" | "yun.139.com" => {
            mobile_link_id(&segments, url).map(|id| (Platform::MobileCloud, id))
        }
        h if PAN123_HOSTS.contains(&h) => match segments.as_slice() {
            ["s", key, ..] => Some(key.trim_end_matches(".html"))
                .filter(|key| is_share_id(key))
                .map(|key| (Platform::Pan123, key.to_string())),
            _ => None,
        },
        _ => None,
    }
}

/// `/s/{id}` with nothing but extra path segments after it.
fn share_segment(segments: &[&str]) -> Option<String> {
    match segments {
        ["s", id, ..] if is_share_id(id) => Some(id.to_string()),
        _ => None,
    }
}

fn baidu_surl(segments: &[&str], url: &Url) -> Option<String> {
    match segments {
        // The /s/ form carries a leading "1" in front of the surl.
        ["s", id] => id
            .strip_prefix('1')
            .filter(|surl| is_share_id(surl))
            .map(str::to_string),
        ["share", "init"] | ["wap", "init"] => query_param(url, "surl").filter(|s| is_share_id(s)),
        _ => None,
    }
}

fn tianyi_code(segments: &[&str], url: &Url) -> Option<String> {
    match segments {
        ["t", code] if is_share_id(code) => Some(code.to_string()),
        ["web", "share"] => query_param(url, "code").filter(|c| is_share_id(c)),
        _ => {
            // h5 pages keep the route in the fragment: #/t/{code} or #/share?code={code}
            let fragment = url.fragment()?;
            if let Some(code) = fragment.strip_prefix("/t/") {
                return Some(code.to_string()).filter(|c| is_share_id(c));
            }
            fragment
                .split_once("code=")
                .map(|(_, rest)| rest.split('&').next().unwrap_or_default().to_string())
                .filter(|c| is_share_id(c))
        }
    }
}

fn mobile_link_id(segments: &[&str], url: &Url) -> Option<String> {
    match segments {
        ["m", "i"] => {
            let query = url.query()?;
            let id = match query_param(url, "linkID") {
                Some(id) => id,
                None => query.split('&').next().unwrap_or_default().to_string(),
            };
            Some(id).filter(|id| is_share_id(id))
        }
        ["w", "i", id] => Some(id.to_string()).filter(|id| is_share_id(id)),
        ["shareweb"] | [] => url
            .fragment()?
            .strip_prefix("/w/i/")
            .map(str::to_string)
            .filter(|id| is_share_id(id)),
        _ => None,
    }
}

/// Extraction code carried in the URL itself.
fn url_password(platform: Platform, url: &Url) -> Option<String> {
    let keys: &[&str] = match platform {
        // `code` is the share id on Tianyi and the query is the id on MobileCloud.
        Platform::Tianyi => &["pwd", "password", "passcode"],
        Platform::MobileCloud => &["pwd", "passwd"],
        _ => &["pwd", "password", "passcode", "code"],
    };
    keys.iter()
        .find_map(|key| query_param(url, key))
        .map(|code| code.trim().to_string())
        .filter(|code| (2..=50).contains(&code.len()))
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn is_share_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
