//! Paginated collection enumeration

use super::CatalogApi;
use crate::config::{Config, EnumerationPolicy, MAX_PAGE_SIZE, RetryConfig};
use crate::error::{EnumerationError, Result};
use crate::retry::download_with_retry;
use crate::types::{EnumeratedCollection, PageGap};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects every item of a collection, page by page
///
/// Pages are requested in order with a continuation token and concatenated, so
/// the resulting order is page order, then in-page order.
pub struct CollectionEnumerator {
    api: Arc<dyn CatalogApi>,
    page_size: u32,
    policy: EnumerationPolicy,
    retry: RetryConfig,
}

impl CollectionEnumerator {
    /// Create an enumerator
    pub fn new(
        api: Arc<dyn CatalogApi>,
        page_size: u32,
        policy: EnumerationPolicy,
        retry: RetryConfig,
    ) -> Self {
        Self {
            api,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            policy,
            retry,
        }
    }

    /// Create an enumerator from the main configuration
    pub fn from_config(api: Arc<dyn CatalogApi>, config: &Config) -> Self {
        Self::new(
            api,
            config.api.page_size,
            config.download.enumeration_policy,
            config.retry.clone(),
        )
    }

    /// Fetch the whole collection
    ///
    /// Under [`EnumerationPolicy::FailFast`] a page that still fails after
    /// retries fails the enumeration and nothing is returned. Under
    /// [`EnumerationPolicy::Partial`] the items gathered so far are returned
    /// with the failed page recorded as a gap.
    pub async fn enumerate(&self, collection_id: &str) -> Result<EnumeratedCollection> {
        let mut collection = EnumeratedCollection::default();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        let mut page = 0;

        loop {
            page += 1;
            let result = download_with_retry(&self.retry, || {
                self.api
                    .list_page(collection_id, self.page_size, token.as_deref())
            })
            .await;

            let listing = match result {
                Ok(listing) => listing,
                Err(e) => match self.policy {
                    EnumerationPolicy::FailFast => {
                        return Err(EnumerationError::PageFailed {
                            collection_id: collection_id.to_string(),
                            page,
                            reason: e.to_string(),
                        }
                        .into());
                    }
                    EnumerationPolicy::Partial => {
                        warn!(
                            collection_id,
                            page,
                            error = %e,
                            kept = collection.items.len(),
                            "listing page failed, keeping partial result"
                        );
                        collection.gaps.push(PageGap {
                            page,
                            reason: e.to_string(),
                        });
                        break;
                    }
                },
            };

            debug!(collection_id, page, items = listing.items.len(), "listing page fetched");
            for mut item in listing.items {
                if item.video_id.is_empty() {
                    warn!(collection_id, page, title = %item.title, "skipping entry without video id");
                    continue;
                }
                if item.title.is_empty() {
                    warn!(collection_id, page, video_id = %item.video_id, "entry has no title, using its video id");
                    item.title = item.video_id.clone();
                }
                collection.items.push(item);
            }

            match listing.next_page_token {
                Some(next) if seen_tokens.insert(next.clone()) => token = Some(next),
                Some(next) => {
                    warn!(collection_id, page, token = %next, "continuation token repeated, stopping");
                    break;
                }
                None => break,
            }
        }

        info!(
            collection_id,
            items = collection.items.len(),
            pages = page,
            gaps = collection.gaps.len(),
            "collection enumerated"
        );
        Ok(collection)
    }
}
