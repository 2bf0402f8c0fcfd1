mod common;

use std::sync::Arc;

use common::fixtures::{open_store, seed_practiced};
use sightwords_core::repository::import::ImportPolicy;
use sightwords_core::repository::CollectionRepository;
use sightwords_core::store::keys::COLLECTIONS_SLOT;
use sightwords_core::store::operations::collections::HistoryEntry;
use sightwords_core::store::operations::settings::PracticeSettingsPatch;
use sightwords_core::store::Store;
use sightwords_core::transfer::{decode_share_url, encode_for_share, export_full, export_stats};

#[test]
fn practice_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let id = {
        let mut repo = CollectionRepository::open(open_store(&dir, "restart.sled"));
        let id = seed_practiced(&mut repo, "Pre-Primer", &["a", "and", "big"]);
        repo.record_session(&id, "a", 3, 4);
        id
    };

    let repo = CollectionRepository::open(open_store(&dir, "restart.sled"));
    let stats = repo.word_stats(&id, "a").expect("stats persisted");
    assert_eq!(stats.correct, 4);
    assert_eq!(stats.incorrect, 1);
    assert_eq!(stats.attempts().count(), 1);
    assert_eq!(stats.sessions().count(), 1);
    assert_eq!(repo.collection_summary(&id).unwrap().words_practiced, 3);
}

#[test]
fn legacy_snapshot_is_upgraded_on_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("legacy.sled");
    let legacy = br#"[{
        "id": "old-1",
        "name": "Primer",
        "words": ["all", "am"],
        "stats": {
            "all": {"correct": 1, "incorrect": 1,
                    "attempts": [{"timestamp": 10, "correct": true}, {"timestamp": 20, "correct": false}]}
        }
    }]"#;

    {
        let store = Store::open(path.to_str().unwrap()).expect("open store");
        store.slots.insert(COLLECTIONS_SLOT, legacy.to_vec()).expect("seed legacy slot");
        store.flush().expect("flush");
    }

    let store = Store::open(path.to_str().unwrap()).expect("reopen store");
    store.run_migrations().expect("run migrations");
    let repo = CollectionRepository::open(Arc::new(store));

    let stats = repo.word_stats("old-1", "all").expect("legacy stats kept");
    assert_eq!(stats.word, "all");
    assert!(matches!(
        stats.history().back(),
        Some(HistoryEntry::Attempt(attempt)) if !attempt.correct && attempt.timestamp == 20
    ));
    assert_eq!(repo.collection_trend("old-1", 10), vec![100.0, 50.0]);

    let raw = repo.store().slots.get(COLLECTIONS_SLOT).unwrap().unwrap();
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(text.contains(r#""kind":"attempt""#));
    assert!(!text.contains(r#""attempts""#));
}

#[test]
fn settings_patch_persists_independently() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let store = open_store(&dir, "settings.sled");
        let patch = PracticeSettingsPatch {
            shuffle_words: Some(false),
            recycle_incorrect: None,
        };
        store.update_practice_settings(patch).expect("update settings");
    }

    let store = open_store(&dir, "settings.sled");
    let settings = store.get_practice_settings().expect("read settings");
    assert!(!settings.shuffle_words);
    assert!(settings.recycle_incorrect);
    assert!(store.load_collections().is_empty());
}

#[test]
fn backup_restores_onto_a_fresh_device() {
    let source_dir = tempfile::tempdir().expect("tempdir");
    let mut source = CollectionRepository::open(open_store(&source_dir, "source.sled"));
    let practiced = seed_practiced(&mut source, "Week 1", &["the", "to"]);
    let untouched = source.add("Week 2", &["was"]);

    let full_link = encode_for_share(&export_full(source.list()), "https://example.org/app").unwrap();
    let stats_link = encode_for_share(&export_stats(source.list()), "https://example.org/app").unwrap();

    let target_dir = tempfile::tempdir().expect("tempdir");
    let mut target = CollectionRepository::open(open_store(&target_dir, "target.sled"));

    // Stats alone have nothing to attach to yet.
    let report = target.apply_import(decode_share_url(&stats_link).unwrap(), ImportPolicy::Skip);
    assert_eq!(report.unmatched.len(), 2);
    assert!(!report.changed());

    let report = target.apply_import(decode_share_url(&full_link).unwrap(), ImportPolicy::Skip);
    assert_eq!(report.added.len(), 2);
    assert_eq!(target.get_by_id(&practiced), source.get_by_id(&practiced));
    assert!(target.get_by_id(&untouched).unwrap().stats.is_none());

    let report = target.apply_import(decode_share_url(&full_link).unwrap(), ImportPolicy::Skip);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(target.len(), 2);
}

#[test]
fn oversized_snapshot_keeps_memory_and_reports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tiny.sled");
    let store = Store::open_with_limit(path.to_str().unwrap(), 128).expect("open store");
    let mut repo = CollectionRepository::open(Arc::new(store));

    let words: Vec<String> = (0..64).map(|i| format!("word{i}")).collect();
    let id = repo.add("Too big", &words);

    assert!(repo.get_by_id(&id).is_some());
    assert!(repo.last_save_error().is_some());
    assert!(repo.store().load_collections().is_empty());
}
