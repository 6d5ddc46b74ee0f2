//! YouTube Data API v3 client

use super::{CatalogApi, ChannelKey};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{CatalogItem, ChannelInfo, ListingPage};
use crate::utils::parse_iso8601_duration;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Catalog backed by the YouTube Data API
///
/// Uses the `channels`, `playlistItems` and `videos` endpoints, authenticated
/// with a static API key.
pub struct YouTubeDataApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeDataApi {
    /// Create a client from the API settings
    ///
    /// Fails with a configuration error when no API key is set.
    pub fn new(config: &ApiConfig, request_timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config("api.api_key", "an API key is required"))?;

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, ?query, "catalog request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CatalogApi for YouTubeDataApi {
    async fn lookup_channel(&self, channel: &str, key: ChannelKey) -> Result<Option<ChannelInfo>> {
        let param = match key {
            ChannelKey::Handle => "forHandle",
            ChannelKey::Username => "forUsername",
            ChannelKey::Id => "id",
        };

        let response: ChannelListResponse = self
            .get_json(
                "channels",
                &[("part", "contentDetails,snippet"), (param, channel)],
            )
            .await?;

        Ok(response.items.into_iter().next().map(|resource| ChannelInfo {
            title: resource.snippet.title,
            uploads_collection_id: resource.content_details.related_playlists.uploads,
        }))
    }

    async fn list_page(
        &self,
        collection_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListingPage> {
        let max_results = page_size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", collection_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: PlaylistItemListResponse = self.get_json("playlistItems", &query).await?;

        Ok(ListingPage {
            items: response
                .items
                .into_iter()
                .map(|entry| CatalogItem::new(entry.snippet.title, entry.snippet.resource_id.video_id))
                .collect(),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn video_duration(&self, video_id: &str) -> Result<Option<Duration>> {
        let response: VideoListResponse = self
            .get_json("videos", &[("part", "contentDetails"), ("id", video_id)])
            .await?;

        let Some(raw) = response
            .items
            .into_iter()
            .next()
            .and_then(|video| video.content_details.duration)
        else {
            return Ok(None);
        };

        let duration = parse_iso8601_duration(&raw);
        if duration.is_none() {
            warn!(video_id, duration = %raw, "unparseable video duration");
        }
        Ok(duration)
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    snippet: ChannelSnippet,
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    resource_id: ResourceId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    #[serde(default)]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    content_details: VideoContentDetails,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: Option<String>,
}
