//! Remote catalog access
//!
//! The catalog answers three questions: which upload collection belongs to a
//! channel, which videos a collection holds (one page at a time), and how long a
//! video is. [`CatalogApi`] abstracts the service so enumeration and the batch
//! can run against fakes; [`YouTubeDataApi`] is the production implementation.

mod enumerate;
mod youtube;

pub use enumerate::CollectionEnumerator;
pub use youtube::YouTubeDataApi;

use crate::error::{LookupError, Result};
use crate::types::{ChannelInfo, ListingPage};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// How a channel string is matched by the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKey {
    /// `@handle`
    Handle,
    /// Legacy username
    Username,
    /// Channel id (`UC...`)
    Id,
}

impl ChannelKey {
    /// Order in which lookups are attempted for `channel`
    pub fn candidates(channel: &str) -> &'static [ChannelKey] {
        if channel.starts_with('@') {
            &[ChannelKey::Handle, ChannelKey::Username, ChannelKey::Id]
        } else {
            &[ChannelKey::Username, ChannelKey::Id]
        }
    }
}

/// Abstraction over the remote catalog, enabling testability
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Look a channel up; `Ok(None)` when nothing matched
    async fn lookup_channel(&self, channel: &str, key: ChannelKey) -> Result<Option<ChannelInfo>>;

    /// Fetch one page of a collection listing
    async fn list_page(
        &self,
        collection_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListingPage>;

    /// Duration of a video; `Ok(None)` when the catalog does not report one
    async fn video_duration(&self, video_id: &str) -> Result<Option<Duration>>;
}

/// Resolve a channel identifier or handle to its upload collection
///
/// Each [`ChannelKey`] candidate is tried in turn. A failed request does not stop
/// the search; it is returned only when no later candidate answers either.
pub async fn resolve_channel(api: &dyn CatalogApi, channel: &str) -> Result<ChannelInfo> {
    let mut last_error = None;

    for key in ChannelKey::candidates(channel) {
        match api.lookup_channel(channel, *key).await {
            Ok(Some(info)) => {
                debug!(channel, ?key, collection = %info.uploads_collection_id, "channel resolved");
                return Ok(info);
            }
            Ok(None) => {
                debug!(channel, ?key, "no channel matched");
            }
            Err(e) => {
                warn!(channel, ?key, error = %e, "channel lookup failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        LookupError::ChannelNotFound {
            channel: channel.to_string(),
        }
        .into()
    }))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    /// Answers lookups from a fixed table and records the keys it was asked with
    struct TableCatalog {
        matches: Vec<(ChannelKey, ChannelInfo)>,
        failing: Vec<ChannelKey>,
        asked: Mutex<Vec<ChannelKey>>,
    }

    #[async_trait]
    impl CatalogApi for TableCatalog {
        async fn lookup_channel(
            &self,
            _channel: &str,
            key: ChannelKey,
        ) -> Result<Option<ChannelInfo>> {
            self.asked.lock().unwrap().push(key);
            if self.failing.contains(&key) {
                return Err(Error::Api {
                    status: 500,
                    endpoint: "channels".into(),
                });
            }
            Ok(self
                .matches
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, info)| info.clone()))
        }

        async fn list_page(&self, _: &str, _: u32, _: Option<&str>) -> Result<ListingPage> {
            Ok(ListingPage::default())
        }

        async fn video_duration(&self, _: &str) -> Result<Option<Duration>> {
            Ok(None)
        }
    }

    fn info() -> ChannelInfo {
        ChannelInfo {
            title: "Some Channel".into(),
            uploads_collection_id: "UU123".into(),
        }
    }

    fn catalog(matches: Vec<(ChannelKey, ChannelInfo)>, failing: Vec<ChannelKey>) -> TableCatalog {
        TableCatalog {
            matches,
            failing,
            asked: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn username_is_tried_before_id() {
        let api = catalog(vec![(ChannelKey::Id, info())], vec![]);
        let resolved = resolve_channel(&api, "UC123").await.unwrap();
        assert_eq!(resolved, info());
        assert_eq!(
            *api.asked.lock().unwrap(),
            vec![ChannelKey::Username, ChannelKey::Id]
        );
    }

    #[tokio::test]
    async fn handles_are_tried_first() {
        let api = catalog(vec![(ChannelKey::Handle, info())], vec![]);
        resolve_channel(&api, "@someone").await.unwrap();
        assert_eq!(*api.asked.lock().unwrap(), vec![ChannelKey::Handle]);
    }

    #[tokio::test]
    async fn no_match_is_channel_not_found() {
        let api = catalog(vec![], vec![]);
        let err = resolve_channel(&api, "nobody").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Lookup(LookupError::ChannelNotFound { ref channel }) if channel == "nobody"
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn failed_username_lookup_falls_back_to_id() {
        let api = catalog(vec![(ChannelKey::Id, info())], vec![ChannelKey::Username]);
        assert_eq!(resolve_channel(&api, "UC123").await.unwrap(), info());
    }

    #[tokio::test]
    async fn error_is_reported_when_nothing_matches() {
        let api = catalog(vec![], vec![ChannelKey::Id]);
        let err = resolve_channel(&api, "UC123").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }
}
