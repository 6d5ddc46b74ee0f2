//! Per-item pipeline: fetch video, fetch audio, merge, clean up
//!
//! Stages run strictly in that order and the first failure ends the item. The
//! pipeline never returns an error: every item ends in a [`MergeOutcome`], and no
//! intermediate part file is left behind in either case.
//!
//! The muxer writes to a staging file that replaces the output only once the
//! merge succeeded, so a failed merge never touches an existing output.

use crate::error::Error;
use crate::muxer::Muxer;
use crate::streams::StreamFetcher;
use crate::types::{CatalogItem, MergeOutcome, Stage, StreamKind};
use crate::utils::sanitize_file_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// File locations used while processing one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartPaths {
    /// Video-only intermediate file
    pub video: PathBuf,
    /// Audio-only intermediate file
    pub audio: PathBuf,
    /// Muxer target, renamed to `output` after a successful merge
    pub staging: PathBuf,
    /// Merged output file
    pub output: PathBuf,
}

impl PartPaths {
    /// Derive the paths for `item` inside `dir`
    ///
    /// Names come from the sanitized title, falling back to the video id, so
    /// the same item always maps to the same files.
    pub fn for_item(dir: &Path, item: &CatalogItem) -> Self {
        Self::with_stem(dir, &sanitize_file_name(&item.title, &item.video_id))
    }

    /// Paths for `item` with its video id appended to the name
    pub fn disambiguated(dir: &Path, item: &CatalogItem) -> Self {
        let stem = sanitize_file_name(&item.title, &item.video_id);
        let id = sanitize_file_name(&item.video_id, "item");
        Self::with_stem(dir, &format!("{}_{}", stem, id))
    }

    fn with_stem(dir: &Path, stem: &str) -> Self {
        Self {
            video: dir.join(format!("{}{}", stem, StreamKind::Video.part_suffix())),
            audio: dir.join(format!("{}{}", stem, StreamKind::Audio.part_suffix())),
            staging: dir.join(format!("{}.partial.mp4", stem)),
            output: dir.join(format!("{}.mp4", stem)),
        }
    }

    /// Intermediate file for a stream kind
    pub fn part(&self, kind: StreamKind) -> &Path {
        match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
        }
    }
}

/// Turns one catalog item into a merged file
pub struct ItemPipeline {
    fetcher: StreamFetcher,
    muxer: Arc<dyn Muxer>,
    /// Output paths handed out so far, with the video id that owns each
    claimed: Mutex<HashMap<PathBuf, String>>,
}

impl ItemPipeline {
    /// Create a pipeline from its collaborators
    pub fn new(fetcher: StreamFetcher, muxer: Arc<dyn Muxer>) -> Self {
        Self {
            fetcher,
            muxer,
            claimed: Mutex::new(HashMap::new()),
        }
    }

    /// Paths for `item`, distinct from those of any other video processed earlier
    ///
    /// The same video keeps its paths across calls. A different video whose
    /// title maps to a claimed name gets its video id appended instead.
    pub fn paths_for(&self, working_dir: &Path, item: &CatalogItem) -> PartPaths {
        let mut claimed = match self.claimed.lock() {
            Ok(claimed) => claimed,
            Err(poisoned) => poisoned.into_inner(),
        };

        let paths = PartPaths::for_item(working_dir, item);
        let paths = match claimed.get(&paths.output) {
            Some(owner) if *owner != item.video_id => {
                debug!(
                    video_id = %item.video_id,
                    owner = %owner,
                    output = %paths.output.display(),
                    "file name already taken, appending video id"
                );
                PartPaths::disambiguated(working_dir, item)
            }
            _ => paths,
        };
        claimed.insert(paths.output.clone(), item.video_id.clone());
        paths
    }

    /// Process `item`, writing into `working_dir`
    pub async fn process(&self, item: &CatalogItem, working_dir: &Path) -> MergeOutcome {
        let paths = self.paths_for(working_dir, item);

        match self.run_stages(item, &paths).await {
            Ok(()) => {
                debug!(video_id = %item.video_id, stage = %Stage::CleaningUp, "stage started");
                remove_parts(&paths).await;
                info!(
                    video_id = %item.video_id,
                    output = %paths.output.display(),
                    "item merged"
                );
                MergeOutcome::Merged {
                    item: item.clone(),
                    output_path: paths.output,
                }
            }
            Err((stage, e)) => {
                warn!(video_id = %item.video_id, %stage, error = %e, "item failed");
                remove_parts(&paths).await;
                MergeOutcome::Failed {
                    item: item.clone(),
                    stage,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        item: &CatalogItem,
        paths: &PartPaths,
    ) -> std::result::Result<(), (Stage, Error)> {
        for kind in [StreamKind::Video, StreamKind::Audio] {
            let stage = Stage::fetching(kind);
            debug!(video_id = %item.video_id, %stage, "stage started");
            self.fetcher
                .fetch(item, kind, paths.part(kind))
                .await
                .map_err(|e| (stage, e))?;
        }

        debug!(
            video_id = %item.video_id,
            stage = %Stage::Merging,
            muxer = self.muxer.name(),
            "stage started"
        );
        self.muxer
            .merge(&paths.video, &paths.audio, &paths.staging)
            .await
            .map_err(|e| (Stage::Merging, e))?;
        tokio::fs::rename(&paths.staging, &paths.output)
            .await
            .map_err(|e| (Stage::Merging, Error::from(e)))
    }
}

async fn remove_parts(paths: &PartPaths) {
    remove_if_exists(&paths.video).await;
    remove_if_exists(&paths.audio).await;
    remove_if_exists(&paths.staging).await;
}

/// Delete a file, logging rather than failing when it cannot be removed
async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}
