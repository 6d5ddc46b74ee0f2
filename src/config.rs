//! Configuration types for channel-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest page size the listing endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 50;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "CHANNEL_DL_API_KEY";

/// Catalog API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Static API key sent with every catalog request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the catalog API (default: "https://www.googleapis.com/youtube/v3")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix turning a bare video id into a playable reference
    #[serde(default = "default_watch_url_prefix")]
    pub watch_url_prefix: String,

    /// Items requested per listing page (default: 50, the API maximum)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            watch_url_prefix: default_watch_url_prefix(),
            page_size: default_page_size(),
        }
    }
}

/// What to do when a listing page cannot be fetched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationPolicy {
    /// Fail the whole enumeration, discarding pages already fetched (default)
    #[default]
    FailFast,
    /// Keep the pages fetched so far and record the gap
    Partial,
}

/// Download behavior configuration (directories, timeouts, enumeration)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory under which a folder per channel is created (default: ".")
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Enumeration failure policy
    #[serde(default)]
    pub enumeration_policy: EnumerationPolicy,

    /// Timeout for catalog requests and for establishing stream transfers (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Abort a stream transfer when no data arrives for this long (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub stall_timeout: Option<Duration>,

    /// Kill the muxer when it runs longer than this (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub merge_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            enumeration_policy: EnumerationPolicy::default(),
            request_timeout: default_request_timeout(),
            stall_timeout: None,
            merge_timeout: None,
        }
    }
}

/// External tool paths (ffmpeg, yt-dlp)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ytdlp_path: None,
            search_path: true,
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// Main configuration
///
/// Download and tool settings are flattened, so a config file reads:
///
/// ```json
/// {
///   "api": { "api_key": "..." },
///   "output_root": "/srv/videos",
///   "ffmpeg_path": "/usr/bin/ffmpeg",
///   "retry": { "max_attempts": 5 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Retry policy for catalog pages and stream transfers
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load a configuration file (JSON)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Take the API key from the environment when one is set there
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.api.api_key = Some(key.trim().to_string());
        }
    }

    /// Check settings that would otherwise fail late
    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 || self.api.page_size > MAX_PAGE_SIZE {
            return Err(Error::config(
                "api.page_size",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config("api.base_url", format!("invalid URL: {}", e)))?;

        match self.api.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(Error::config(
                    "api.api_key",
                    format!(
                        "an API key is required (config file or {} environment variable)",
                        API_KEY_ENV
                    ),
                ));
            }
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be at least 1.0",
            ));
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}

fn default_watch_url_prefix() -> String {
    "https://www.youtube.com/watch?v=".into()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
