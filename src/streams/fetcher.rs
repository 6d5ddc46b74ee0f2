//! HTTP transfer of a selected stream to disk

use super::{StreamFormat, StreamResolver, select_best};
use crate::config::{Config, RetryConfig};
use crate::error::{FetchError, Result};
use crate::progress::ProgressReporter;
use crate::retry::download_with_retry;
use crate::types::{CatalogItem, DownloadedPart, StreamKind, TransferProgress};
use futures::StreamExt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads one stream of an item into a file
pub struct StreamFetcher {
    client: reqwest::Client,
    resolver: Arc<dyn StreamResolver>,
    reporter: Arc<dyn ProgressReporter>,
    retry: RetryConfig,
    stall_timeout: Option<Duration>,
    watch_url_prefix: String,
}

impl StreamFetcher {
    /// Create a fetcher with its own HTTP client
    pub fn new(
        resolver: Arc<dyn StreamResolver>,
        reporter: Arc<dyn ProgressReporter>,
        config: &Config,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.download.request_timeout)
            .build()?;
        Ok(Self::with_client(client, resolver, reporter, config))
    }

    /// Create a fetcher sharing an existing HTTP client
    pub fn with_client(
        client: reqwest::Client,
        resolver: Arc<dyn StreamResolver>,
        reporter: Arc<dyn ProgressReporter>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            resolver,
            reporter,
            retry: config.retry.clone(),
            stall_timeout: config.download.stall_timeout,
            watch_url_prefix: config.api.watch_url_prefix.clone(),
        }
    }

    /// Resolve, select and download the `kind` stream of `item` into `destination`
    ///
    /// The destination is created (or truncated) on every attempt. On failure a
    /// partially written file may remain; removing it is the caller's job.
    pub async fn fetch(
        &self,
        item: &CatalogItem,
        kind: StreamKind,
        destination: &Path,
    ) -> Result<DownloadedPart> {
        let watch_url = item.watch_url(&self.watch_url_prefix);
        let formats = self.resolver.resolve(&watch_url).await?;
        let format = select_best(&formats, kind).ok_or_else(|| FetchError::NoMatchingFormat {
            kind,
            container: kind.container(),
            video_id: item.video_id.clone(),
        })?;
        debug!(
            video_id = %item.video_id,
            %kind,
            format_id = %format.format_id,
            height = ?format.height,
            bitrate = ?format.bitrate,
            resolver = self.resolver.name(),
            "selected stream"
        );

        let bytes =
            download_with_retry(&self.retry, || self.transfer(format, kind, destination)).await?;

        info!(
            video_id = %item.video_id,
            %kind,
            bytes,
            path = %destination.display(),
            "stream downloaded"
        );
        Ok(DownloadedPart {
            kind,
            path: destination.to_path_buf(),
        })
    }

    /// One transfer attempt; returns the number of bytes written
    async fn transfer(&self, format: &StreamFormat, kind: StreamKind, destination: &Path) -> Result<u64> {
        let response = self
            .within_stall_timeout(kind, 0, self.client.get(&format.url).send())
            .await??;

        let status = response.status();
        if is_permanent_rejection(status) {
            return Err(FetchError::Rejected {
                kind,
                status: status.as_u16(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(FetchError::Transfer {
                kind,
                path: destination.to_path_buf(),
                received: 0,
                reason: format!("HTTP {}", status),
            }
            .into());
        }

        let total = response
            .content_length()
            .filter(|len| *len > 0)
            .or(format.filesize)
            .unwrap_or(0);
        let mut progress = TransferProgress::start(kind, total);
        let mut file = tokio::fs::File::create(destination).await?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = self
            .within_stall_timeout(kind, progress.bytes_transferred, body.next())
            .await?
        {
            let chunk = chunk.map_err(|e| FetchError::Transfer {
                kind,
                path: destination.to_path_buf(),
                received: progress.bytes_transferred,
                reason: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
            progress.bytes_transferred += chunk.len() as u64;
            self.reporter.report(&progress);
        }
        file.flush().await?;

        // An advertised size is an estimate; close the status line on the real count
        if progress.total_bytes > 0 {
            progress.total_bytes = progress.bytes_transferred;
        }
        self.reporter.finish(&progress);

        Ok(progress.bytes_transferred)
    }

    async fn within_stall_timeout<T>(
        &self,
        kind: StreamKind,
        received: u64,
        future: impl Future<Output = T>,
    ) -> Result<T> {
        match self.stall_timeout {
            Some(after) => tokio::time::timeout(after, future).await.map_err(|_| {
                FetchError::Stalled {
                    kind,
                    received,
                    after,
                }
                .into()
            }),
            None => Ok(future.await),
        }
    }
}

/// 4xx answers other than timeout and rate limiting do not change on retry
fn is_permanent_rejection(status: reqwest::StatusCode) -> bool {
    status.is_client_error()
        && status != reqwest::StatusCode::REQUEST_TIMEOUT
        && status != reqwest::StatusCode::TOO_MANY_REQUESTS
}
