//! Batch orchestration over a whole channel
//!
//! The orchestrator resolves a channel to its upload collection, enumerates it
//! and hands the items to the [`ItemPipeline`] one at a time, in enumeration
//! order. A failed item is recorded and the batch moves on; only channel lookup
//! and enumeration failures stop a batch before it starts.

use crate::catalog::{CatalogApi, CollectionEnumerator, YouTubeDataApi, resolve_channel};
use crate::config::Config;
use crate::error::Result;
use crate::muxer::FfmpegMuxer;
use crate::pipeline::ItemPipeline;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::streams::{StreamFetcher, YtDlpResolver};
use crate::types::{BatchResult, ChannelInfo, Event, MergeOutcome, VideoDetails};
use crate::utils::sanitize_file_name;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Capacity of the event channel; slow subscribers miss older events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Drives the per-item pipeline over every video of a channel
pub struct BatchOrchestrator {
    catalog: Arc<dyn CatalogApi>,
    enumerator: CollectionEnumerator,
    pipeline: ItemPipeline,
    reporter: Arc<dyn ProgressReporter>,
    event_tx: broadcast::Sender<Event>,
}

impl BatchOrchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        enumerator: CollectionEnumerator,
        pipeline: ItemPipeline,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            catalog,
            enumerator,
            pipeline,
            reporter: Arc::new(SilentReporter),
            event_tx,
        }
    }

    /// Hand every event to `reporter` as well, before it is broadcast
    ///
    /// The reporter sees events in order with the transfer progress of the
    /// item being processed.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Wire the production collaborators described by `config`
    ///
    /// Fails when the API key is missing or an external tool cannot be found.
    pub fn from_config(config: &Config, reporter: Arc<dyn ProgressReporter>) -> Result<Self> {
        let catalog: Arc<dyn CatalogApi> = Arc::new(YouTubeDataApi::new(
            &config.api,
            config.download.request_timeout,
        )?);
        let resolver = Arc::new(YtDlpResolver::from_config(&config.tools)?);
        let muxer = Arc::new(
            FfmpegMuxer::from_config(&config.tools)?.with_timeout(config.download.merge_timeout),
        );

        let enumerator = CollectionEnumerator::from_config(catalog.clone(), config);
        let fetcher = StreamFetcher::new(resolver, reporter.clone(), config)?;
        let pipeline = ItemPipeline::new(fetcher, muxer);
        Ok(Self::new(catalog, enumerator, pipeline).with_reporter(reporter))
    }

    fn emit(&self, event: Event) {
        self.reporter.event(&event);
        self.event_tx.send(event).ok();
    }

    /// Subscribe to batch events
    ///
    /// Events sent before the call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Resolve `channel` and download every one of its videos
    ///
    /// Files are written to `<output_root>/<sanitized channel title>`, which is
    /// created when missing.
    pub async fn run(&self, channel: &str, output_root: &Path) -> Result<BatchResult> {
        let info = resolve_channel(self.catalog.as_ref(), channel).await?;
        let working_dir = channel_dir(output_root, &info);
        info!(
            channel,
            title = %info.title,
            collection = %info.uploads_collection_id,
            dir = %working_dir.display(),
            "channel resolved"
        );
        self.run_collection(&info.uploads_collection_id, &working_dir)
            .await
    }

    /// Download every video of a collection into `working_dir`
    pub async fn run_collection(
        &self,
        collection_id: &str,
        working_dir: &Path,
    ) -> Result<BatchResult> {
        let started_at = Utc::now();
        tokio::fs::create_dir_all(working_dir).await?;

        let collection = self.enumerator.enumerate(collection_id).await?;
        let total = collection.items.len();
        self.emit(Event::EnumerationComplete {
            total,
            gaps: collection.gaps.len(),
        });

        let mut result = BatchResult::empty(started_at);
        result.gaps = collection.gaps;

        if collection.items.is_empty() {
            info!(collection_id, "no items found");
            self.emit(Event::NoItems);
            result.finished_at = Utc::now();
            return Ok(result);
        }

        for (position, item) in collection.items.iter().enumerate() {
            let index = position + 1;
            info!(index, total, video_id = %item.video_id, title = %item.title, "processing item");
            self.emit(Event::ItemStarted {
                index,
                total,
                title: item.title.clone(),
            });

            let outcome = self.pipeline.process(item, working_dir).await;
            let event = match &outcome {
                MergeOutcome::Merged { output_path, .. } => Event::ItemMerged {
                    index,
                    output_path: output_path.clone(),
                },
                MergeOutcome::Failed { stage, reason, .. } => Event::ItemFailed {
                    index,
                    stage: *stage,
                    error: reason.clone(),
                },
            };
            self.emit(event);
            result.outcomes.push(outcome);
        }

        result.finished_at = Utc::now();
        let (succeeded, failed) = (result.succeeded(), result.failed());
        info!(
            collection_id,
            succeeded,
            failed,
            elapsed_secs = (result.finished_at - result.started_at).num_seconds(),
            "batch complete"
        );
        self.emit(Event::BatchComplete { succeeded, failed });
        Ok(result)
    }

    /// List every video of `channel` with its duration, without downloading
    ///
    /// A duration that cannot be fetched is logged and reported as `None`.
    pub async fn list_details(&self, channel: &str) -> Result<Vec<VideoDetails>> {
        let info = resolve_channel(self.catalog.as_ref(), channel).await?;
        let collection = self
            .enumerator
            .enumerate(&info.uploads_collection_id)
            .await?;
        self.emit(Event::EnumerationComplete {
            total: collection.items.len(),
            gaps: collection.gaps.len(),
        });

        let mut details = Vec::with_capacity(collection.items.len());
        for item in collection.items {
            let duration = match self.catalog.video_duration(&item.video_id).await {
                Ok(duration) => duration,
                Err(e) => {
                    warn!(video_id = %item.video_id, error = %e, "failed to fetch video duration");
                    None
                }
            };
            details.push(VideoDetails { item, duration });
        }
        Ok(details)
    }
}

/// Directory holding the files of a channel
pub fn channel_dir(output_root: &Path, info: &ChannelInfo) -> PathBuf {
    output_root.join(sanitize_file_name(&info.title, &info.uploads_collection_id))
}
