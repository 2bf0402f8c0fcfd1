use std::sync::Arc;

use tempfile::TempDir;

use sightwords_core::repository::CollectionRepository;
use sightwords_core::store::Store;

pub fn open_store(dir: &TempDir, name: &str) -> Arc<Store> {
    let path = dir.path().join(name);
    let store = Store::open(path.to_str().expect("utf-8 temp path")).expect("open store");
    store.run_migrations().expect("run migrations");
    Arc::new(store)
}

pub fn open_repo(name: &str) -> (TempDir, CollectionRepository) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir, name);
    (dir, CollectionRepository::open(store))
}

/// Collection with a few graded answers already recorded.
pub fn seed_practiced(repo: &mut CollectionRepository, name: &str, words: &[&str]) -> String {
    let id = repo.add(name, words);
    for (idx, word) in words.iter().enumerate() {
        repo.record_attempt_at(&id, word, idx % 2 == 0, 1_700_000_000_000 + idx as i64);
    }
    id
}
