//! # channel-dl
//!
//! Downloads every video of a YouTube channel as a single mp4 per video.
//!
//! The channel is resolved to its upload collection, the collection is listed
//! page by page, and each video is then processed on its own: the best mp4
//! video-only stream and the best m4a audio-only stream are downloaded, merged
//! with ffmpeg, and the intermediate files are removed. A failing video never
//! stops the batch.
//!
//! ## Quick Start
//!
//! ```no_run
//! use channel_dl::{BatchOrchestrator, Config, ConsoleReporter};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.api_key = Some("my-api-key".to_string());
//!
//!     let batch = BatchOrchestrator::from_config(&config, Arc::new(ConsoleReporter::stdout()))?;
//!
//!     // Subscribe to events
//!     let mut events = batch.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let result = batch.run("@somechannel", Path::new(".")).await?;
//!     println!("{} merged, {} failed", result.succeeded(), result.failed());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Channel batch orchestration
pub mod batch;
/// Remote catalog access and enumeration
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Stream merging
pub mod muxer;
/// Per-item download pipeline
pub mod pipeline;
/// Console rendering of transfer progress and batch events
pub mod progress;
/// Retry logic with exponential backoff
pub mod retry;
/// Stream resolution and transfer
pub mod streams;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::BatchOrchestrator;
pub use catalog::{CatalogApi, ChannelKey, CollectionEnumerator, YouTubeDataApi, resolve_channel};
pub use config::{Config, EnumerationPolicy, RetryConfig};
pub use error::{EnumerationError, Error, FetchError, LookupError, MergeError, Result};
pub use muxer::{FfmpegMuxer, Muxer};
pub use pipeline::{ItemPipeline, PartPaths};
pub use progress::{ConsoleReporter, ProgressReporter, SilentReporter};
pub use streams::{StreamFetcher, StreamFormat, StreamResolver, YtDlpResolver};
pub use types::{
    BatchResult, CatalogItem, ChannelInfo, Event, MergeOutcome, Stage, StreamKind,
    TransferProgress, VideoDetails,
};
