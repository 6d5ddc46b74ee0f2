//! Per-item pipeline: stream transfer from a mock server, fake muxer, cleanup guarantees

mod common;

use channel_dl::{
    CatalogItem, Config, ItemPipeline, MergeOutcome, Muxer, PartPaths, SilentReporter, Stage,
    StreamFetcher, StreamResolver,
};
use common::{
    ConcatMuxer, MockResolver, assert_no_part_files, audio_bytes, file_names, mount_streams,
    test_config, video_bytes,
};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

fn pipeline(
    config: &Config,
    resolver: Arc<dyn StreamResolver>,
    muxer: Arc<dyn Muxer>,
) -> ItemPipeline {
    let fetcher = StreamFetcher::new(resolver, Arc::new(SilentReporter), config).unwrap();
    ItemPipeline::new(fetcher, muxer)
}

#[tokio::test]
async fn merged_output_replaces_both_parts() {
    let server = MockServer::start().await;
    mount_streams(&server, "v1").await;
    let dir = TempDir::new().unwrap();
    let muxer = Arc::new(ConcatMuxer::default());
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        muxer.clone(),
    );

    let item = CatalogItem::new("First Clip", "v1");
    let outcome = pipeline.process(&item, dir.path()).await;

    let expected_output = dir.path().join("First Clip.mp4");
    assert_eq!(
        outcome,
        MergeOutcome::Merged {
            item,
            output_path: expected_output.clone(),
        }
    );
    let mut expected = video_bytes("v1");
    expected.extend(audio_bytes("v1"));
    assert_eq!(std::fs::read(&expected_output).unwrap(), expected);
    assert_eq!(file_names(dir.path()), vec!["First Clip.mp4"]);
    assert_eq!(muxer.calls(), vec![dir.path().join("First Clip.partial.mp4")]);
}

#[tokio::test]
async fn missing_audio_format_fails_in_audio_stage_and_cleans_up() {
    let server = MockServer::start().await;
    mount_streams(&server, "v2").await;
    let dir = TempDir::new().unwrap();
    let muxer = Arc::new(ConcatMuxer::default());
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server).without_audio("v2")),
        muxer.clone(),
    );

    let outcome = pipeline
        .process(&CatalogItem::new("No Audio", "v2"), dir.path())
        .await;

    match outcome {
        MergeOutcome::Failed { stage, reason, .. } => {
            assert_eq!(stage, Stage::FetchingAudio);
            assert!(reason.contains("m4a"), "unexpected reason: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(file_names(dir.path()).is_empty());
    assert!(muxer.calls().is_empty());
}

#[tokio::test]
async fn unavailable_video_stream_fails_in_video_stage() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::default()),
    );

    let outcome = pipeline
        .process(&CatalogItem::new("Gone", "v404"), dir.path())
        .await;

    assert!(matches!(
        outcome,
        MergeOutcome::Failed {
            stage: Stage::FetchingVideo,
            ..
        }
    ));
    assert!(file_names(dir.path()).is_empty());
}

#[tokio::test]
async fn merge_failure_removes_parts_and_partial_output() {
    let server = MockServer::start().await;
    mount_streams(&server, "v3").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::failing_on("Broken")),
    );

    let outcome = pipeline
        .process(&CatalogItem::new("Broken Clip", "v3"), dir.path())
        .await;

    match outcome {
        MergeOutcome::Failed { stage, reason, .. } => {
            assert_eq!(stage, Stage::Merging);
            assert_eq!(reason, "merge error: muxer exited with status 1");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(file_names(dir.path()).is_empty());
}

#[tokio::test]
async fn rerun_overwrites_stale_files() {
    let server = MockServer::start().await;
    mount_streams(&server, "v4").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::default()),
    );
    let item = CatalogItem::new("Again", "v4");

    // Leftovers from an interrupted earlier run
    let paths = PartPaths::for_item(dir.path(), &item);
    std::fs::write(&paths.video, b"stale video that is much longer than nothing").unwrap();
    std::fs::write(&paths.output, b"stale output").unwrap();

    let first = pipeline.process(&item, dir.path()).await;
    let second = pipeline.process(&item, dir.path()).await;

    assert_eq!(first, second);
    let mut expected = video_bytes("v4");
    expected.extend(audio_bytes("v4"));
    assert_eq!(std::fs::read(&paths.output).unwrap(), expected);
    assert_no_part_files(dir.path());
}

#[tokio::test]
async fn title_with_reserved_characters_is_sanitized() {
    let server = MockServer::start().await;
    mount_streams(&server, "v5").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::default()),
    );

    let outcome = pipeline
        .process(&CatalogItem::new("What? A/B test", "v5"), dir.path())
        .await;

    assert!(outcome.is_success());
    assert_eq!(file_names(dir.path()), vec!["What_ A_B test.mp4"]);
}

#[tokio::test]
async fn failed_merge_keeps_an_existing_output() {
    let server = MockServer::start().await;
    mount_streams(&server, "k1").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::failing_on("Keep")),
    );
    let earlier = dir.path().join("Keep.mp4");
    std::fs::write(&earlier, b"merged by an earlier run").unwrap();

    let outcome = pipeline
        .process(&CatalogItem::new("Keep", "k1"), dir.path())
        .await;

    assert!(matches!(
        outcome,
        MergeOutcome::Failed {
            stage: Stage::Merging,
            ..
        }
    ));
    assert_eq!(std::fs::read(&earlier).unwrap(), b"merged by an earlier run");
    assert_eq!(file_names(dir.path()), vec!["Keep.mp4"]);
}

#[tokio::test]
async fn duplicate_titles_get_distinct_files() {
    let server = MockServer::start().await;
    mount_streams(&server, "id1").await;
    mount_streams(&server, "id2").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::default()),
    );

    let first = pipeline
        .process(&CatalogItem::new("Same", "id1"), dir.path())
        .await;
    let second = pipeline
        .process(&CatalogItem::new("Same", "id2"), dir.path())
        .await;

    assert!(first.is_success() && second.is_success());
    assert_eq!(file_names(dir.path()), vec!["Same.mp4", "Same_id2.mp4"]);
    let mut expected = video_bytes("id1");
    expected.extend(audio_bytes("id1"));
    assert_eq!(std::fs::read(dir.path().join("Same.mp4")).unwrap(), expected);
}

#[tokio::test]
async fn failed_duplicate_leaves_the_earlier_item_merged() {
    let server = MockServer::start().await;
    mount_streams(&server, "id1").await;
    mount_streams(&server, "id2").await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &test_config(&server.uri()),
        Arc::new(MockResolver::new(&server)),
        Arc::new(ConcatMuxer::failing_on("id2")),
    );

    let first = pipeline
        .process(&CatalogItem::new("Same", "id1"), dir.path())
        .await;
    let second = pipeline
        .process(&CatalogItem::new("Same", "id2"), dir.path())
        .await;

    match first {
        MergeOutcome::Merged { output_path, .. } => assert!(output_path.exists()),
        other => panic!("expected merge, got {other:?}"),
    }
    assert!(!second.is_success());
    assert_eq!(file_names(dir.path()), vec!["Same.mp4"]);
}
