//! Stream resolution using the external yt-dlp binary

use super::{StreamFormat, StreamResolver};
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Protocols that are not a single HTTP resource and cannot be streamed to a file as is
const MANIFEST_PROTOCOLS: [&str; 4] = ["m3u8", "m3u8_native", "http_dash_segments", "mhtml"];

/// Resolver backed by `yt-dlp --dump-single-json`
///
/// # Examples
///
/// ```no_run
/// use channel_dl::streams::{StreamResolver, YtDlpResolver};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = YtDlpResolver::from_path().expect("yt-dlp not found in PATH");
/// let formats = resolver.resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
/// println!("{} formats", formats.len());
/// # Ok(())
/// # }
/// ```
pub struct YtDlpResolver {
    binary_path: PathBuf,
}

impl YtDlpResolver {
    /// Create a resolver with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Use the configured binary, or search PATH when allowed
    pub fn from_config(tools: &crate::config::ToolsConfig) -> Result<Self> {
        match (&tools.ytdlp_path, tools.search_path) {
            (Some(path), _) => Ok(Self::new(path.clone())),
            (None, true) => Self::from_path()
                .ok_or_else(|| Error::NotSupported("yt-dlp not found in PATH".into())),
            (None, false) => Err(Error::NotSupported(
                "no yt-dlp path configured and PATH search disabled".into(),
            )),
        }
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    async fn resolve(&self, watch_url: &str) -> Result<Vec<StreamFormat>> {
        let output = Command::new(&self.binary_path)
            .args([
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--skip-download",
            ])
            .arg(watch_url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .trim()
                .to_string();
            return Err(FetchError::Resolve {
                url: watch_url.to_string(),
                reason,
            }
            .into());
        }

        let formats = parse_formats(&output.stdout)?;
        debug!(url = watch_url, count = formats.len(), "resolved stream formats");
        Ok(formats)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    #[serde(default)]
    format_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    filesize: Option<f64>,
    #[serde(default)]
    filesize_approx: Option<f64>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| !c.is_empty() && c != "none")
}

/// Convert yt-dlp's info JSON into the formats that can be streamed over plain HTTP
pub(crate) fn parse_formats(json: &[u8]) -> Result<Vec<StreamFormat>> {
    let info: VideoInfo = serde_json::from_slice(json)?;

    Ok(info
        .formats
        .into_iter()
        .filter(|f| {
            f.protocol
                .as_deref()
                .is_none_or(|p| !MANIFEST_PROTOCOLS.contains(&p))
        })
        .filter_map(|f| {
            let url = f.url.filter(|u| !u.is_empty())?;
            let has_video = has_codec(&f.vcodec);
            let has_audio = has_codec(&f.acodec);
            Some(StreamFormat {
                format_id: f.format_id.unwrap_or_default(),
                url,
                container: f.ext.unwrap_or_default(),
                has_video,
                has_audio,
                height: f.height,
                bitrate: f.tbr.or(f.abr),
                filesize: f.filesize.or(f.filesize_approx).map(|s| s as u64),
            })
        })
        .collect())
}
