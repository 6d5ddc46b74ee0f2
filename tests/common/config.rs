//! Test configuration helpers

use channel_dl::{Config, RetryConfig};
use std::time::Duration;

/// Prefix used for watch URLs in tests; the fake resolver strips it to find the video id
pub const WATCH_PREFIX: &str = "https://watch.test/?v=";

/// API key the catalog mocks expect
pub const TEST_API_KEY: &str = "integration-key";

/// Configuration pointing the catalog at a mock server, with retries disabled
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.api_key = Some(TEST_API_KEY.to_string());
    config.api.base_url = base_url.to_string();
    config.api.watch_url_prefix = WATCH_PREFIX.to_string();
    config.download.request_timeout = Duration::from_secs(5);
    config.retry = RetryConfig::disabled();
    config
}
