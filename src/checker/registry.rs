//! Platform → checker lookup.

use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;

use super::{
    AliyunChecker, BaiduChecker, LinkChecker, MobileCloudChecker, Pan115Checker, Pan123Checker,
    SharePageChecker, TianyiChecker, XunleiChecker,
};
use crate::config::PlatformEndpoints;
use crate::error_handling::ConfigError;
use crate::link::Platform;

/// Checkers keyed by platform.
///
/// Checkers can be swapped per platform (tests register fakes), but the set of
/// keys is the closed `Platform` enum and [`CheckerRegistry::validate`] makes
/// sure every platform is covered before the engine starts.
#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: HashMap<Platform, Arc<dyn LinkChecker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the production checker for every platform.
    pub fn with_default_checkers(
        client: Arc<reqwest::Client>,
        endpoints: &PlatformEndpoints,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SharePageChecker::quark(
            Arc::clone(&client),
            &endpoints.quark_token,
            &endpoints.quark_detail,
        )));
        registry.register(Arc::new(SharePageChecker::uc(
            Arc::clone(&client),
            &endpoints.uc,
        )));
        registry.register(Arc::new(BaiduChecker::new(
            Arc::clone(&client),
            &endpoints.baidu,
        )));
        registry.register(Arc::new(TianyiChecker::new(
            Arc::clone(&client),
            &endpoints.tianyi,
        )));
        registry.register(Arc::new(Pan123Checker::new(
            Arc::clone(&client),
            &endpoints.pan123,
        )));
        registry.register(Arc::new(Pan115Checker::new(
            Arc::clone(&client),
            &endpoints.pan115,
        )));
        registry.register(Arc::new(AliyunChecker::new(
            Arc::clone(&client),
            &endpoints.aliyun,
        )));
        registry.register(Arc::new(XunleiChecker::new(
            Arc::clone(&client),
            &endpoints.xunlei_user,
            &endpoints.xunlei_api,
        )));
        registry.register(Arc::new(MobileCloudChecker::new(client, &endpoints.mobile)));
        registry
    }

    /// Adds or replaces the checker for its platform, returning the old one.
    pub fn register(&mut self, checker: Arc<dyn LinkChecker>) -> Option<Arc<dyn LinkChecker>> {
        self.checkers.insert(checker.platform(), checker)
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn LinkChecker>> {
        self.checkers.get(&platform)
    }

    /// Fails if any platform the classifier can produce has no checker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Platform::iter().find(|p| !self.checkers.contains_key(p)) {
            Some(missing) => Err(ConfigError::MissingChecker(missing)),
            None => Ok(()),
        }
    }
}
