//! ffmpeg-based muxer

use super::Muxer;
use crate::config::ToolsConfig;
use crate::error::{Error, MergeError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Muxer that invokes the external ffmpeg binary
pub struct FfmpegMuxer {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegMuxer {
    /// Create a new muxer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Use the configured binary, or search PATH when allowed
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        match (&tools.ffmpeg_path, tools.search_path) {
            (Some(path), _) => Ok(Self::new(path.clone())),
            (None, true) => Self::from_path()
                .ok_or_else(|| Error::NotSupported("ffmpeg not found in PATH".into())),
            (None, false) => Err(Error::NotSupported(
                "no ffmpeg path configured and PATH search disabled".into(),
            )),
        }
    }

    /// Kill the muxer when it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Arguments for a stream-copy merge, overwriting the output
fn merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-nostdin", "-y", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(video.into());
    args.push("-i".into());
    args.push(audio.into());
    args.extend(["-c", "copy"].map(OsString::from));
    args.push(output.into());
    args
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        debug!(
            binary = %self.binary_path.display(),
            video = %video.display(),
            audio = %audio.display(),
            output = %output.display(),
            "starting muxer"
        );

        let child = Command::new(&self.binary_path)
            .args(merge_args(video, audio, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MergeError::Spawn {
                binary: self.binary_path.clone(),
                reason: e.to_string(),
            })?;

        // Dropping the pending future on timeout kills the child
        let result = match self.timeout {
            Some(after) => tokio::time::timeout(after, child.wait_with_output())
                .await
                .map_err(|_| MergeError::TimedOut { after })?,
            None => child.wait_with_output().await,
        };
        let output_status = result?;

        if output_status.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output_status.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        warn!(
            status = ?output_status.status.code(),
            stderr = %tail.into_iter().rev().collect::<Vec<_>>().join(" | "),
            "muxer failed"
        );

        Err(match output_status.status.code() {
            Some(code) => MergeError::ExitStatus { code },
            None => MergeError::Terminated,
        }
        .into())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
