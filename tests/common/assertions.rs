//! Custom test assertions for integration tests

use channel_dl::Event;
use std::path::Path;
use tokio::sync::broadcast;

/// Drain every event already sent to `events`
pub fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Names of the files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Assert that no intermediate stream file is left in `dir`
pub fn assert_no_part_files(dir: &Path) {
    let leftovers: Vec<String> = file_names(dir)
        .into_iter()
        .filter(|name| {
            name.ends_with("_videoonly.mp4")
                || name.ends_with("_audioonly.m4a")
                || name.ends_with(".partial.mp4")
        })
        .collect();
    assert!(
        leftovers.is_empty(),
        "intermediate files left behind: {:?}",
        leftovers
    );
}
