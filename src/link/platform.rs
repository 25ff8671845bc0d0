//! The fixed set of supported share platforms.

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

/// A cloud-storage platform whose share links we know how to check.
///
/// The set is closed: classification, deduplication and checker dispatch all
/// match on this enum.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[serde(rename = "quark")]
    #[strum(serialize = "quark")]
    #[value(name = "quark")]
    Quark,
    #[serde(rename = "uc")]
    #[strum(serialize = "uc")]
    #[value(name = "uc")]
    Uc,
    #[serde(rename = "baidu")]
    #[strum(serialize = "baidu")]
    #[value(name = "baidu")]
    Baidu,
    #[serde(rename = "tianyi")]
    #[strum(serialize = "tianyi", serialize = "189")]
    #[value(name = "tianyi", alias = "189")]
    Tianyi,
    #[serde(rename = "123pan")]
    #[strum(serialize = "123pan", serialize = "123")]
    #[value(name = "123pan", alias = "123")]
    Pan123,
    #[serde(rename = "115")]
    #[strum(serialize = "115")]
    #[value(name = "115")]
    Pan115,
    #[serde(rename = "aliyun")]
    #[strum(serialize = "aliyun", serialize = "alipan")]
    #[value(name = "aliyun", alias = "alipan")]
    Aliyun,
    #[serde(rename = "xunlei")]
    #[strum(serialize = "xunlei")]
    #[value(name = "xunlei")]
    Xunlei,
    #[serde(rename = "mobile")]
    #[strum(serialize = "mobile", serialize = "139")]
    #[value(name = "mobile", alias = "139")]
    MobileCloud,
}

impl Platform {
    /// Stable identifier used in storage, JSON and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Quark => "quark",
            Platform::Uc => "uc",
            Platform::Baidu => "baidu",
            Platform::Tianyi => "tianyi",
            Platform::Pan123 => "123pan",
            Platform::Pan115 => "115",
            Platform::Aliyun => "aliyun",
            Platform::Xunlei => "xunlei",
            Platform::MobileCloud => "mobile",
        }
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Quark => "夸克网盘",
            Platform::Uc => "UC网盘",
            Platform::Baidu => "百度网盘",
            Platform::Tianyi => "天翼云盘",
            Platform::Pan123 => "123云盘",
            Platform::Pan115 => "115网盘",
            Platform::Aliyun => "阿里云盘",
            Platform::Xunlei => "迅雷云盘",
            Platform::MobileCloud => "移动云盘",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_nine_platforms() {
        assert_eq!(Platform::iter().count(), 9);
    }

    #[test]
    fn test_as_str_round_trips_through_from_str() {
        for platform in Platform::iter() {
            assert_eq!(Platform::from_str(platform.as_str()).unwrap(), platform);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Platform::from_str("189").unwrap(), Platform::Tianyi);
        assert_eq!(Platform::from_str("ALIPAN").unwrap(), Platform::Aliyun);
        assert!(Platform::from_str("dropbox").is_err());
    }

    #[test]
    fn test_serde_uses_stable_ids() {
        let json = serde_json::to_string(&Platform::Pan123).unwrap();
        assert_eq!(json, "\"123pan\"");
        let back: Platform = serde_json::from_str("\"mobile\"").unwrap();
        assert_eq!(back, Platform::MobileCloud);
    }
}
