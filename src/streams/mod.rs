//! Stream resolution and transfer
//!
//! A video is offered as a set of representations (formats), each with a
//! container, its tracks and a quality. [`StreamResolver`] produces that set for a
//! watch URL; [`select_best`] picks the representation to download for a
//! [`StreamKind`]; [`StreamFetcher`] writes it to disk while reporting progress.
//!
//! Implementations of the resolver:
//!
//! - [`YtDlpResolver`]: asks the external `yt-dlp` binary for the format list

mod fetcher;
mod ytdlp;

pub use fetcher::StreamFetcher;
pub use ytdlp::YtDlpResolver;

use crate::error::Result;
use crate::types::StreamKind;
use async_trait::async_trait;

/// One downloadable representation of a video
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFormat {
    /// Resolver-specific identifier
    pub format_id: String,
    /// Direct HTTP(S) URL of the bytes
    pub url: String,
    /// Container / file extension (e.g. "mp4", "m4a", "webm")
    pub container: String,
    /// Carries a video track
    pub has_video: bool,
    /// Carries an audio track
    pub has_audio: bool,
    /// Vertical resolution, for video
    pub height: Option<u32>,
    /// Average bitrate in kbit/s
    pub bitrate: Option<f64>,
    /// Advertised size in bytes
    pub filesize: Option<u64>,
}

/// Turns a playable reference into its available representations
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// List the representations of the video at `watch_url`
    async fn resolve(&self, watch_url: &str) -> Result<Vec<StreamFormat>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick the highest-quality representation of `kind` in its expected container
///
/// Video is ranked by height, then bitrate; audio by bitrate. On equal quality a
/// representation without the other kind's track wins, so the muxer receives
/// clean elementary streams.
pub fn select_best(formats: &[StreamFormat], kind: StreamKind) -> Option<&StreamFormat> {
    let container = kind.container();
    let candidates = formats
        .iter()
        .filter(|f| f.container.eq_ignore_ascii_case(container))
        .filter(|f| match kind {
            StreamKind::Video => f.has_video,
            StreamKind::Audio => f.has_audio,
        });

    match kind {
        StreamKind::Video => candidates.max_by(|a, b| {
            a.height
                .unwrap_or(0)
                .cmp(&b.height.unwrap_or(0))
                .then(b.has_audio.cmp(&a.has_audio))
                .then(a.bitrate.unwrap_or(0.0).total_cmp(&b.bitrate.unwrap_or(0.0)))
        }),
        StreamKind::Audio => candidates.max_by(|a, b| {
            a.bitrate
                .unwrap_or(0.0)
                .total_cmp(&b.bitrate.unwrap_or(0.0))
                .then(b.has_video.cmp(&a.has_video))
        }),
    }
}
