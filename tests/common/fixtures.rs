//! Mock catalog responses, fake stream resolution and a fake muxer

use super::config::{TEST_API_KEY, WATCH_PREFIX};
use async_trait::async_trait;
use channel_dl::{MergeError, Muxer, Result, StreamFormat, StreamResolver};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Video bytes served for `video_id`
pub fn video_bytes(video_id: &str) -> Vec<u8> {
    format!("VIDEO:{video_id}:").repeat(256).into_bytes()
}

/// Audio bytes served for `video_id`
pub fn audio_bytes(video_id: &str) -> Vec<u8> {
    format!("AUDIO:{video_id}:").repeat(64).into_bytes()
}

/// Mount a successful channel lookup by legacy username
pub async fn mount_channel(server: &MockServer, username: &str, title: &str, uploads: &str) {
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("forUsername", username))
        .and(query_param("key", TEST_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "snippet": { "title": title },
                "contentDetails": { "relatedPlaylists": { "uploads": uploads } }
            }]
        })))
        .mount(server)
        .await;
}

/// Mount an empty answer for every channel lookup not matched by an earlier mock
pub async fn mount_no_channels(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(server)
        .await;
}

/// Mount a paginated listing; page `n` (0-based) answers token `Tn`
///
/// Each entry of a page is `(title, video_id)`.
pub async fn mount_listing(server: &MockServer, playlist_id: &str, pages: &[Vec<(&str, &str)>]) {
    for (index, page) in pages.iter().enumerate() {
        let items: Vec<_> = page
            .iter()
            .map(|(title, id)| {
                json!({ "snippet": { "title": title, "resourceId": { "videoId": id } } })
            })
            .collect();
        let mut body = json!({ "items": items });
        if index + 1 < pages.len() {
            body["nextPageToken"] = json!(format!("T{}", index + 1));
        }

        let mock = Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("playlistId", playlist_id))
            .and(query_param("maxResults", "50"));
        let mock = if index == 0 {
            mock.and(query_param_is_missing("pageToken"))
        } else {
            mock.and(query_param("pageToken", format!("T{index}").as_str()))
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

/// Mount a failing listing page for token `Tn`
pub async fn mount_failing_page(server: &MockServer, playlist_id: &str, index: usize, status: u16) {
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", playlist_id))
        .and(query_param("pageToken", format!("T{index}").as_str()))
        .respond_with(ResponseTemplate::new(status))
        .with_priority(1)
        .mount(server)
        .await;
}

/// Mount the video and audio stream bodies of `video_id`
pub async fn mount_streams(server: &MockServer, video_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/streams/{video_id}/video")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(video_bytes(video_id)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/streams/{video_id}/audio")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio_bytes(video_id)))
        .mount(server)
        .await;
}

/// Resolver offering one mp4 video and one m4a audio format per video, served by a mock server
pub struct MockResolver {
    base_url: String,
    without_audio: HashSet<String>,
}

impl MockResolver {
    /// Formats point at `server`
    pub fn new(server: &MockServer) -> Self {
        Self {
            base_url: server.uri(),
            without_audio: HashSet::new(),
        }
    }

    /// Offer no m4a format for `video_id`
    pub fn without_audio(mut self, video_id: &str) -> Self {
        self.without_audio.insert(video_id.to_string());
        self
    }
}

#[async_trait]
impl StreamResolver for MockResolver {
    async fn resolve(&self, watch_url: &str) -> Result<Vec<StreamFormat>> {
        let video_id = watch_url.trim_start_matches(WATCH_PREFIX);
        let mut formats = vec![
            StreamFormat {
                format_id: "webm-hd".into(),
                url: format!("{}/streams/{video_id}/webm", self.base_url),
                container: "webm".into(),
                has_video: true,
                has_audio: false,
                height: Some(2160),
                bitrate: Some(9000.0),
                filesize: None,
            },
            StreamFormat {
                format_id: "137".into(),
                url: format!("{}/streams/{video_id}/video", self.base_url),
                container: "mp4".into(),
                has_video: true,
                has_audio: false,
                height: Some(1080),
                bitrate: Some(4000.0),
                filesize: None,
            },
        ];
        if !self.without_audio.contains(video_id) {
            formats.push(StreamFormat {
                format_id: "140".into(),
                url: format!("{}/streams/{video_id}/audio", self.base_url),
                container: "m4a".into(),
                has_video: false,
                has_audio: true,
                height: None,
                bitrate: Some(128.0),
                filesize: None,
            });
        }
        Ok(formats)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Muxer that concatenates its inputs, failing for targets whose name contains a marker
///
/// A failing merge leaves a partial output behind, like an interrupted muxer would.
#[derive(Default)]
pub struct ConcatMuxer {
    fail_marker: Option<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ConcatMuxer {
    /// Fail every merge whose output file name contains `marker`
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outputs requested so far, in order
    pub fn calls(&self) -> Vec<PathBuf> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Muxer for ConcatMuxer {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(output.to_path_buf());
        }

        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);

        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(marker) = &self.fail_marker
            && name.contains(marker.as_str())
        {
            tokio::fs::write(output, &merged[..merged.len() / 2]).await?;
            return Err(MergeError::ExitStatus { code: 1 }.into());
        }

        tokio::fs::write(output, merged).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "concat"
    }
}
