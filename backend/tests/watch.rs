use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use backend::ingest::IngestSettings;
use backend::store::MemoryStore;
use backend::watch::{DirectoryWatch, FileState, ScanDiff};
use chrono::FixedOffset;
use pretty_assertions::assert_eq;

fn fixture(dir: &Path, fixture: &str, name: &str, age_secs: u64) -> PathBuf {
    let source = format!("{}/../testfiles/{}", env!("CARGO_MANIFEST_DIR"), fixture);
    let target = dir.join(name);
    std::fs::copy(source, &target).unwrap();

    let modified = SystemTime::now() - Duration::from_secs(age_secs);
    std::fs::File::options()
        .write(true)
        .open(&target)
        .unwrap()
        .set_modified(modified)
        .unwrap();

    target
}

fn settings() -> IngestSettings {
    IngestSettings {
        league: "Nexus".to_owned(),
        season: 1,
        utc_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

#[tokio::test]
async fn scan_tracks_added_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let newer = fixture(dir.path(), "cursed_hollow.json", "Match 1 Round 2.json", 10);
    let older = fixture(dir.path(), "cursed_hollow.json", "Match 1 Round 1.json", 60);
    fixture(dir.path(), "cursed_hollow.json", "notes.txt", 0);
    let mut watch = DirectoryWatch::new(dir.path(), "json");

    let diff = watch.scan().await.unwrap();

    assert_eq!(diff.added.len(), 2);
    assert!(diff.removed.is_empty());
    assert_eq!(watch.pending(), vec![older.clone(), newer.clone()]);
    assert_eq!(watch.state(&older), Some(&FileState::Pending));

    assert_eq!(watch.scan().await.unwrap(), ScanDiff::default());

    std::fs::remove_file(&older).unwrap();
    let diff = watch.scan().await.unwrap();
    assert_eq!(
        diff,
        ScanDiff {
            removed: vec![older.clone()],
            ..Default::default()
        }
    );
    assert_eq!(watch.state(&older), None);
    assert_eq!(watch.files().count(), 1);
}

#[tokio::test]
async fn poll_ingests_pending_files_once() {
    let dir = tempfile::tempdir().unwrap();
    let good = fixture(dir.path(), "cursed_hollow.json", "Match 1 Round 1.json", 30);
    let bad = fixture(dir.path(), "two_cores.json", "Match 1 Round 2.json", 20);
    let mut watch = DirectoryWatch::new(dir.path(), ".JSON");
    let mut store = MemoryStore::new();

    let ingested = watch.poll(&mut store, &settings()).await.unwrap();

    assert_eq!(ingested, 1);
    assert!(matches!(
        watch.state(&good),
        Some(FileState::Processed { .. })
    ));
    match watch.state(&bad) {
        Some(FileState::Failed { error }) => assert!(error.contains("destroyed objectives"), "{}", error),
        other => panic!("unexpected state {:?}", other),
    }
    assert!(watch.pending().is_empty());
    assert_eq!(store.stat_count(), 4);

    let later = fixture(dir.path(), "cursed_hollow.json", "Match 2 Round 1.json", 0);
    let ingested = watch.poll(&mut store, &settings()).await.unwrap();

    assert_eq!(ingested, 1);
    assert!(matches!(watch.state(&later), Some(FileState::Processed { .. })));
    assert_eq!(store.stat_count(), 8);
}

#[tokio::test]
async fn rewritten_file_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let source = format!("{}/../testfiles/cursed_hollow.json", env!("CARGO_MANIFEST_DIR"));
    let content = std::fs::read(source).unwrap();
    let path = dir.path().join("Match 1 Round 1.json");
    // caught halfway through the copy
    std::fs::write(&path, &content[..content.len() / 2]).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(60))
        .unwrap();
    let mut watch = DirectoryWatch::new(dir.path(), "json");
    let mut store = MemoryStore::new();

    assert_eq!(watch.poll(&mut store, &settings()).await.unwrap(), 0);
    assert!(matches!(watch.state(&path), Some(FileState::Failed { .. })));
    assert_eq!(watch.poll(&mut store, &settings()).await.unwrap(), 0);

    fixture(dir.path(), "cursed_hollow.json", "Match 1 Round 1.json", 0);
    let diff = watch.scan().await.unwrap();

    assert_eq!(
        diff,
        ScanDiff {
            changed: vec![path.clone()],
            ..Default::default()
        }
    );
    assert_eq!(watch.state(&path), Some(&FileState::Pending));
    assert_eq!(watch.poll(&mut store, &settings()).await.unwrap(), 1);
    assert!(matches!(watch.state(&path), Some(FileState::Processed { .. })));
    assert_eq!(store.stat_count(), 4);
}
