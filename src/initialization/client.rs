//! HTTP client initialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{default_headers, Config, MAX_REDIRECT_HOPS, TCP_CONNECT_TIMEOUT_SECS};
use crate::error_handling::InitializationError;

/// Initializes the HTTP client shared by every platform checker.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent and browser-like default headers
/// - Request timeout equal to the per-check timeout
/// - A shorter connect timeout so unreachable hosts fail fast
/// - Redirect following (up to `MAX_REDIRECT_HOPS`), needed for Quark short links
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(config.check_timeout())
        .connect_timeout(Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))
        .user_agent(config.user_agent.clone())
        .default_headers(default_headers())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECT_HOPS))
        .build()?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_client_with_defaults() {
        let client = init_client(&Config::default());
        assert!(client.is_ok());
    }
}
