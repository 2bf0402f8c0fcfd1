//! The in-memory, authoritative collection set.
//!
//! `CollectionRepository` owns every `Collection`. Each mutating call writes the
//! full set back through [`Store::save_collections`] before returning; a failed
//! save is logged and remembered in [`CollectionRepository::last_save_error`] but
//! never undoes the in-memory change.

pub mod import;
pub mod statistics;

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::constants::{SAMPLE_COLLECTION_NAME, SAMPLE_COLLECTION_WORDS};
use crate::repository::import::ImportPolicy;
use crate::services::defaults_provider::DefaultsProvider;
use crate::store::operations::collections::{clean_words, Collection};
use crate::store::Store;

#[derive(Debug)]
pub struct CollectionRepository {
    store: Arc<Store>,
    collections: Vec<Collection>,
    first_run: bool,
    last_save_error: Option<String>,
}

impl CollectionRepository {
    /// Load the persisted set. Records with a blank or repeated id get a fresh one.
    pub fn open(store: Arc<Store>) -> Self {
        let (loaded, first_run) = match store.read_collections() {
            Ok(Some(collections)) => (collections, false),
            Ok(None) => (Vec::new(), true),
            Err(error) => {
                tracing::error!(error = %error, "Failed to load collections, starting empty");
                (Vec::new(), false)
            }
        };

        let mut repo = Self {
            store,
            collections: Vec::with_capacity(loaded.len()),
            first_run,
            last_save_error: None,
        };

        let mut seen = HashSet::new();
        for mut collection in loaded {
            if collection.id.trim().is_empty() || !seen.insert(collection.id.clone()) {
                let fresh = repo.generate_id();
                tracing::warn!(old_id = %collection.id, new_id = %fresh, "Reassigning collection id");
                collection.id = fresh.clone();
                seen.insert(fresh);
            }
            collection.name = collection.name.trim().to_string();
            collection.words = clean_words(&collection.words);
            repo.collections.push(collection);
        }

        tracing::info!(count = repo.collections.len(), first_run, "Collections loaded");
        repo
    }

    /// First-run seeding. Returns how many collections were seeded.
    ///
    /// With a manifest provider the defaults are fetched and imported (existing ids
    /// skipped); a failed fetch leaves the set empty and the next start tries again.
    /// Without a provider the built-in sample collection is added.
    pub async fn initialize(&mut self, provider: Option<&DefaultsProvider>) -> usize {
        if !self.first_run {
            return 0;
        }
        match self.store.defaults_loaded() {
            Ok(true) => {
                self.first_run = false;
                return 0;
            }
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read defaults flag, seeding anyway");
            }
        }

        let seeded = match provider {
            Some(provider) => match provider.fetch().await {
                Ok(defaults) => self.import_collections(defaults, ImportPolicy::Skip).added.len(),
                Err(error) => {
                    tracing::warn!(url = provider.url(), error = %error, "Default collections unavailable, continuing without them");
                    return 0;
                }
            },
            None => {
                self.add(SAMPLE_COLLECTION_NAME, SAMPLE_COLLECTION_WORDS);
                1
            }
        };

        if let Err(error) = self.store.mark_defaults_loaded() {
            tracing::warn!(error = %error, "Failed to persist defaults flag");
        }
        self.first_run = false;
        tracing::info!(seeded, "Default collections seeded");
        seeded
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn list(&self) -> &[Collection] {
        &self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Message of the most recent failed save, cleared by the next successful one.
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn add<S: AsRef<str>>(&mut self, name: &str, words: &[S]) -> String {
        let id = self.generate_id();
        self.collections.push(Collection {
            id: id.clone(),
            name: name.trim().to_string(),
            words: clean_words(words),
            stats: None,
        });
        self.persist();
        tracing::debug!(%id, "Collection added");
        id
    }

    /// Replace name and words. Existing stats are kept, including entries for
    /// words that are no longer in the list.
    pub fn update<S: AsRef<str>>(&mut self, id: &str, name: &str, words: &[S]) -> bool {
        let Some(collection) = self.collection_mut(id) else {
            return false;
        };
        collection.name = name.trim().to_string();
        collection.words = clean_words(words);
        self.persist();
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.collections.iter().position(|c| c.id == id) else {
            return false;
        };
        self.collections.remove(index);
        self.persist();
        tracing::debug!(%id, "Collection deleted");
        true
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Concatenate the words of several collections in the given order; unknown ids are skipped.
    pub fn words_from_many<S: AsRef<str>>(&self, ids: &[S]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.get_by_id(id.as_ref()))
            .flat_map(|c| c.words.iter().cloned())
            .collect()
    }

    /// Forget all practice data of a collection ("never practiced" again).
    pub fn reset_stats(&mut self, id: &str) -> bool {
        let Some(collection) = self.collection_mut(id) else {
            return false;
        };
        collection.stats = None;
        self.persist();
        true
    }

    pub(crate) fn collection_mut(&mut self, id: &str) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn push_collection(&mut self, collection: Collection) {
        self.collections.push(collection);
    }

    pub(crate) fn contains_id(&self, id: &str) -> bool {
        self.collections.iter().any(|c| c.id == id)
    }

    pub(crate) fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    pub(crate) fn persist(&mut self) -> bool {
        match self.store.save_collections(&self.collections) {
            Ok(()) => {
                self.last_save_error = None;
                true
            }
            Err(error) => {
                tracing::error!(error = %error, count = self.collections.len(), "Failed to save collections");
                self.last_save_error = Some(error.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::config::DefaultsConfig;

    pub(crate) fn open_repo(name: &str) -> (TempDir, CollectionRepository) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        let store = Arc::new(Store::open(path.to_str().unwrap()).unwrap());
        (dir, CollectionRepository::open(store))
    }

    #[test]
    fn add_trims_and_persists() {
        let (_dir, mut repo) = open_repo("repo-add");
        let id = repo.add("  Week 1  ", &[" the ", "", "and", "   ", "the"]);

        let collection = repo.get_by_id(&id).unwrap();
        assert_eq!(collection.name, "Week 1");
        assert_eq!(collection.words, vec!["the", "and", "the"]);
        assert!(collection.stats.is_none());

        let persisted = repo.store().load_collections();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0], *collection);
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let (_dir, repo) = open_repo("repo-ids");
        let ids: HashSet<String> = (0..10_000).map(|_| repo.generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn update_keeps_stats() {
        let (_dir, mut repo) = open_repo("repo-update");
        let id = repo.add("List", &["a", "b"]);
        repo.record_attempt(&id, "a", true);

        assert!(repo.update(&id, " Renamed ", &["b", "c"]));
        let collection = repo.get_by_id(&id).unwrap();
        assert_eq!(collection.name, "Renamed");
        assert_eq!(collection.words, vec!["b", "c"]);
        assert_eq!(collection.word_stats("a").unwrap().correct, 1);
    }

    #[test]
    fn unknown_ids_mutate_nothing() {
        let (_dir, mut repo) = open_repo("repo-unknown");
        repo.add("List", &["a"]);
        let before = repo.list().to_vec();

        assert!(!repo.update("missing", "x", &["y"]));
        assert!(!repo.delete("missing"));
        assert!(!repo.reset_stats("missing"));
        assert_eq!(repo.list(), before.as_slice());
    }

    #[test]
    fn delete_removes_record_and_stats() {
        let (_dir, mut repo) = open_repo("repo-delete");
        let id = repo.add("List", &["a"]);
        repo.record_attempt(&id, "a", false);

        assert!(repo.delete(&id));
        assert!(repo.get_by_id(&id).is_none());
        assert!(repo.store().load_collections().is_empty());
        assert!(!repo.delete(&id));
    }

    #[test]
    fn words_from_many_keeps_order_and_skips_unknown() {
        let (_dir, mut repo) = open_repo("repo-many");
        let first = repo.add("One", &["a", "b"]);
        let second = repo.add("Two", &["c"]);

        let words = repo.words_from_many(&[second.as_str(), "nope", first.as_str()]);
        assert_eq!(words, vec!["c", "a", "b"]);
    }

    #[test]
    fn reopen_reassigns_duplicate_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo-dup");
        let store = Arc::new(Store::open(path.to_str().unwrap()).unwrap());
        let twin = Collection {
            id: "same".into(),
            name: "Twin".into(),
            words: vec![" a ".into()],
            stats: None,
        };
        store.save_collections(&[twin.clone(), twin]).unwrap();

        let repo = CollectionRepository::open(store);
        assert_eq!(repo.len(), 2);
        assert_ne!(repo.list()[0].id, repo.list()[1].id);
        assert_eq!(repo.list()[1].words, vec!["a"]);
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo-full");
        let store = Arc::new(Store::open_with_limit(path.to_str().unwrap(), 64).unwrap());
        let mut repo = CollectionRepository::open(store);

        let id = repo.add("A name long enough to blow the tiny quota", &["word"; 8]);
        assert!(repo.get_by_id(&id).is_some());
        assert!(repo.last_save_error().unwrap().contains("capacity exceeded"));
        assert!(repo.store().load_collections().is_empty());

        assert!(repo.delete(&id));
        assert!(repo.last_save_error().is_none());
    }

    #[tokio::test]
    async fn first_run_seeds_sample_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repo-seed");
        let store = Arc::new(Store::open(path.to_str().unwrap()).unwrap());

        let mut repo = CollectionRepository::open(store.clone());
        assert_eq!(repo.initialize(None).await, 1);
        assert_eq!(repo.list()[0].name, SAMPLE_COLLECTION_NAME);
        assert_eq!(repo.list()[0].words.len(), SAMPLE_COLLECTION_WORDS.len());
        assert_eq!(repo.initialize(None).await, 0);

        let id = repo.list()[0].id.clone();
        repo.delete(&id);
        drop(repo);

        let mut reopened = CollectionRepository::open(store);
        assert_eq!(reopened.initialize(None).await, 0);
        assert!(reopened.is_empty());
    }

    #[tokio::test]
    async fn manifest_defaults_are_imported() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("defaults.json");
        std::fs::write(
            &manifest,
            br#"[{"id":"pre-primer","name":"Pre-Primer","words":["a","and"]},
                 {"id":"primer","name":"Primer","words":["all"]}]"#,
        )
        .unwrap();
        let provider = DefaultsProvider::from_config(&DefaultsConfig {
            url: format!("file://{}", manifest.display()),
            timeout_secs: 2,
        })
        .unwrap();

        let (_db_dir, mut repo) = open_repo("repo-manifest");
        assert_eq!(repo.initialize(Some(&provider)).await, 2);
        assert_eq!(repo.get_by_id("primer").unwrap().words, vec!["all"]);
        assert!(repo.store().defaults_loaded().unwrap());
    }

    #[tokio::test]
    async fn failed_manifest_fetch_leaves_app_usable() {
        let provider = DefaultsProvider::from_config(&DefaultsConfig {
            url: "file:///nowhere/defaults.json".to_string(),
            timeout_secs: 1,
        })
        .unwrap();

        let (_dir, mut repo) = open_repo("repo-manifest-fail");
        assert_eq!(repo.initialize(Some(&provider)).await, 0);
        assert!(repo.is_empty());
        assert!(!repo.store().defaults_loaded().unwrap());

        let id = repo.add("Mine", &["x"]);
        assert!(repo.get_by_id(&id).is_some());
    }

    #[tokio::test]
    async fn manifest_timeout_retries_next_start() {
        let url = crate::services::defaults_provider::silent_manifest_server().await;
        let provider = DefaultsProvider::from_config(&DefaultsConfig {
            url,
            timeout_secs: 1,
        })
        .unwrap();

        let (_dir, mut repo) = open_repo("repo-manifest-timeout");
        assert_eq!(repo.initialize(Some(&provider)).await, 0);
        assert!(repo.is_empty());
        assert!(!repo.store().defaults_loaded().unwrap());
    }
}
