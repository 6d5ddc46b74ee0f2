//! Core types for channel-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Kind of elementary stream fetched for an item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Video-only stream, expected in an mp4 container
    Video,
    /// Audio-only stream, expected in an m4a container
    Audio,
}

impl StreamKind {
    /// Container format a representation must use to be selected for this kind
    pub fn container(&self) -> &'static str {
        match self {
            StreamKind::Video => "mp4",
            StreamKind::Audio => "m4a",
        }
    }

    /// Label used on the progress line
    pub fn label(&self) -> &'static str {
        match self {
            StreamKind::Video => "Video",
            StreamKind::Audio => "Audio",
        }
    }

    /// Suffix appended to the title for the intermediate part file
    pub fn part_suffix(&self) -> &'static str {
        match self {
            StreamKind::Video => "_videoonly.mp4",
            StreamKind::Audio => "_audioonly.m4a",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// A video of a collection, as listed by the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Display title, trimmed of surrounding whitespace
    pub title: String,
    /// Bare video id
    pub video_id: String,
}

impl CatalogItem {
    /// Create a new item, trimming the title
    pub fn new(title: impl AsRef<str>, video_id: impl Into<String>) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            video_id: video_id.into(),
        }
    }

    /// Playable reference for this item
    pub fn watch_url(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.video_id)
    }
}

/// Result of a channel lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel display title
    pub title: String,
    /// Id of the collection holding every upload of the channel
    pub uploads_collection_id: String,
}

/// One page of a collection listing
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    /// Items in page order
    pub items: Vec<CatalogItem>,
    /// Token for the next page, if any
    pub next_page_token: Option<String>,
}

/// A page that could not be fetched under the partial enumeration policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageGap {
    /// 1-based page number
    pub page: usize,
    /// Why the page failed
    pub reason: String,
}

/// Full, ordered item list of a collection
#[derive(Clone, Debug, Default)]
pub struct EnumeratedCollection {
    /// Items in page order, then in-page order
    pub items: Vec<CatalogItem>,
    /// Pages that were skipped (always empty under fail-fast)
    pub gaps: Vec<PageGap>,
}

impl EnumeratedCollection {
    /// Whether every page was fetched
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Progress of an active stream transfer
#[derive(Clone, Debug)]
pub struct TransferProgress {
    /// Stream being transferred
    pub kind: StreamKind,
    /// Bytes received so far
    pub bytes_transferred: u64,
    /// Expected total (0 when unknown)
    pub total_bytes: u64,
    /// When the transfer started
    pub started_at: Instant,
}

impl TransferProgress {
    /// Start tracking a transfer
    pub fn start(kind: StreamKind, total_bytes: u64) -> Self {
        Self {
            kind,
            bytes_transferred: 0,
            total_bytes,
            started_at: Instant::now(),
        }
    }

    /// Time since the transfer started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// A stream written to disk, awaiting the muxer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedPart {
    /// Stream kind of the file
    pub kind: StreamKind,
    /// Location of the file
    pub path: PathBuf,
}

/// Stage of the item pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Downloading the video-only stream
    FetchingVideo,
    /// Downloading the audio-only stream
    FetchingAudio,
    /// Running the external muxer
    Merging,
    /// Removing intermediate files
    CleaningUp,
}

impl Stage {
    /// Fetch stage for a stream kind
    pub fn fetching(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Video => Stage::FetchingVideo,
            StreamKind::Audio => Stage::FetchingAudio,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::FetchingVideo => "fetching video",
            Stage::FetchingAudio => "fetching audio",
            Stage::Merging => "merging",
            Stage::CleaningUp => "cleaning up",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Both streams were downloaded and merged
    Merged {
        /// The item
        item: CatalogItem,
        /// Location of the merged file
        output_path: PathBuf,
    },
    /// The item failed at some stage
    Failed {
        /// The item
        item: CatalogItem,
        /// Stage where the failure occurred
        stage: Stage,
        /// Error message
        reason: String,
    },
}

impl MergeOutcome {
    /// The item this outcome belongs to
    pub fn item(&self) -> &CatalogItem {
        match self {
            MergeOutcome::Merged { item, .. } | MergeOutcome::Failed { item, .. } => item,
        }
    }

    /// Whether the item was merged
    pub fn is_success(&self) -> bool {
        matches!(self, MergeOutcome::Merged { .. })
    }
}

/// Per-item outcomes of a batch, in processing order
#[derive(Clone, Debug)]
pub struct BatchResult {
    /// One outcome per enumerated item
    pub outcomes: Vec<MergeOutcome>,
    /// Pages skipped during enumeration
    pub gaps: Vec<PageGap>,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the batch finished
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    pub(crate) fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            outcomes: Vec::new(),
            gaps: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch had no items
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of merged items
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed items
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// A listed video together with its duration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoDetails {
    /// The video
    pub item: CatalogItem,
    /// Duration, if the catalog reported one
    pub duration: Option<Duration>,
}

/// Events emitted by the batch orchestrator
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The collection was enumerated
    EnumerationComplete {
        /// Number of items found
        total: usize,
        /// Number of pages skipped
        gaps: usize,
    },

    /// The collection is empty
    NoItems,

    /// An item is about to be processed
    ItemStarted {
        /// 1-based position
        index: usize,
        /// Number of items in the batch
        total: usize,
        /// Item title
        title: String,
    },

    /// An item was merged
    ItemMerged {
        /// 1-based position
        index: usize,
        /// Location of the merged file
        output_path: PathBuf,
    },

    /// An item failed
    ItemFailed {
        /// 1-based position
        index: usize,
        /// Stage where the failure occurred
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Every item was processed
    BatchComplete {
        /// Number of merged items
        succeeded: usize,
        /// Number of failed items
        failed: usize,
    },
}
