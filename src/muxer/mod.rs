//! Combining a video-only and an audio-only file into one container
//!
//! Implementations:
//!
//! - [`FfmpegMuxer`]: runs the external `ffmpeg` binary with stream copy

mod ffmpeg;

pub use ffmpeg::FfmpegMuxer;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for merging elementary streams
///
/// # Examples
///
/// ```no_run
/// use channel_dl::muxer::{FfmpegMuxer, Muxer};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let muxer = FfmpegMuxer::from_path().expect("ffmpeg not found");
/// muxer
///     .merge(
///         Path::new("clip_videoonly.mp4"),
///         Path::new("clip_audioonly.m4a"),
///         Path::new("clip.mp4"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Merge `video` and `audio` into `output` without re-encoding
    ///
    /// An existing `output` is overwritten. Success means the muxer reported a
    /// zero exit status.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Get the name of this muxer implementation
    fn name(&self) -> &'static str;
}
