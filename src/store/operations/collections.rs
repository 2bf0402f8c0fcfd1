use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{ATTEMPT_HISTORY_CAPACITY, SESSION_HISTORY_CAPACITY};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// A named, ordered list of practice words.
///
/// `stats` stays `None` until the collection is practiced for the first time;
/// `Some(vec![])` and `None` are not the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_stats"
    )]
    pub stats: Option<Vec<WordStats>>,
}

impl Collection {
    pub fn word_stats(&self, word: &str) -> Option<&WordStats> {
        self.stats.as_ref()?.iter().find(|s| s.word == word)
    }

    /// Populate zeroed stats for the current words if the collection was never practiced.
    /// Returns true when stats were created.
    pub fn ensure_stats(&mut self) -> bool {
        if self.stats.is_some() {
            return false;
        }
        self.stats = Some(self.words.iter().map(|w| WordStats::new(w)).collect());
        true
    }

    /// Find-or-create the stats entry for `word`, initializing the table first if needed.
    pub fn word_stats_mut(&mut self, word: &str) -> &mut WordStats {
        self.ensure_stats();
        let stats = self.stats.get_or_insert_with(Vec::new);
        let index = match stats.iter().position(|s| s.word == word) {
            Some(index) => index,
            None => {
                stats.push(WordStats::new(word));
                stats.len() - 1
            }
        };
        &mut stats[index]
    }
}

/// Trim every word and drop the ones that end up empty. Duplicates are kept.
pub fn clean_words<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .filter_map(|w| {
            let trimmed = w.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub correct: u64,
    pub attempted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryEntry {
    Attempt(AttemptRecord),
    Session(SessionRecord),
}

impl HistoryEntry {
    pub fn capacity(&self) -> usize {
        match self {
            HistoryEntry::Attempt(_) => ATTEMPT_HISTORY_CAPACITY,
            HistoryEntry::Session(_) => SESSION_HISTORY_CAPACITY,
        }
    }

    fn same_kind(&self, other: &HistoryEntry) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Correctness counters plus the bounded recent history of one word in one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawWordStats")]
pub struct WordStats {
    pub word: String,
    pub correct: u64,
    pub incorrect: u64,
    history: VecDeque<HistoryEntry>,
}

impl WordStats {
    pub fn new(word: &str) -> Self {
        Self {
            word: word.to_string(),
            correct: 0,
            incorrect: 0,
            history: VecDeque::new(),
        }
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    pub fn attempts(&self) -> impl Iterator<Item = &AttemptRecord> + '_ {
        self.history.iter().filter_map(|e| match e {
            HistoryEntry::Attempt(a) => Some(a),
            HistoryEntry::Session(_) => None,
        })
    }

    pub fn sessions(&self) -> impl Iterator<Item = &SessionRecord> + '_ {
        self.history.iter().filter_map(|e| match e {
            HistoryEntry::Session(s) => Some(s),
            HistoryEntry::Attempt(_) => None,
        })
    }

    /// Append an entry, evicting the oldest entry of the same kind once that kind is over its cap.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        let capacity = entry.capacity();
        self.history.push_back(entry);
        while self.history.iter().filter(|e| e.same_kind(&entry)).count() > capacity {
            if let Some(oldest) = self.history.iter().position(|e| e.same_kind(&entry)) {
                self.history.remove(oldest);
            }
        }
    }

    /// Counters come from imported data too, so the sum saturates.
    pub fn total(&self) -> u64 {
        self.correct.saturating_add(self.incorrect)
    }
}

// Every persisted or imported WordStats passes through this shape, so older
// layouts are upgraded here and nowhere else.
#[derive(Deserialize)]
struct RawWordStats {
    #[serde(default)]
    word: String,
    #[serde(default)]
    correct: u64,
    #[serde(default)]
    incorrect: u64,
    #[serde(default)]
    attempts: Option<Vec<RawHistoryEntry>>,
    #[serde(default)]
    history: Option<Vec<RawHistoryEntry>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHistoryEntry {
    Tagged(HistoryEntry),
    Attempt(AttemptRecord),
    Session(SessionRecord),
}

impl From<RawHistoryEntry> for HistoryEntry {
    fn from(raw: RawHistoryEntry) -> Self {
        match raw {
            RawHistoryEntry::Tagged(entry) => entry,
            RawHistoryEntry::Attempt(a) => HistoryEntry::Attempt(a),
            RawHistoryEntry::Session(s) => HistoryEntry::Session(s),
        }
    }
}

impl From<RawWordStats> for WordStats {
    fn from(raw: RawWordStats) -> Self {
        let mut stats = WordStats {
            word: raw.word,
            correct: raw.correct,
            incorrect: raw.incorrect,
            history: VecDeque::new(),
        };
        let entries = raw
            .attempts
            .into_iter()
            .flatten()
            .chain(raw.history.into_iter().flatten());
        for entry in entries {
            stats.push_history(entry.into());
        }
        stats
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatsLayout {
    List(Vec<WordStats>),
    Keyed(BTreeMap<String, WordStats>),
}

fn deserialize_stats<'de, D>(deserializer: D) -> Result<Option<Vec<WordStats>>, D::Error>
where
    D: Deserializer<'de>,
{
    let layout = Option::<StatsLayout>::deserialize(deserializer)?;
    Ok(layout.map(|layout| match layout {
        StatsLayout::List(list) => list,
        StatsLayout::Keyed(map) => map
            .into_iter()
            .map(|(word, mut stats)| {
                if stats.word.is_empty() {
                    stats.word = word;
                }
                stats
            })
            .collect(),
    }))
}

impl Store {
    /// Read the collections slot. `Ok(None)` means the slot was never written.
    ///
    /// A record that fails to parse is skipped; the rest of the snapshot survives.
    pub fn read_collections(&self) -> Result<Option<Vec<Collection>>, StoreError> {
        let raw = match self.read_slot(keys::COLLECTIONS_SLOT)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let records: Vec<serde_json::Value> = Self::deserialize(&raw)?;
        let mut collections = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Collection>(record) {
                Ok(collection) => collections.push(collection),
                Err(error) => {
                    tracing::warn!(index, error = %error, "Skipping malformed collection record");
                }
            }
        }
        Ok(Some(collections))
    }

    /// Fail-soft load: missing or corrupt data yields an empty set.
    pub fn load_collections(&self) -> Vec<Collection> {
        match self.read_collections() {
            Ok(collections) => collections.unwrap_or_default(),
            Err(error) => {
                tracing::error!(error = %error, "Failed to load collections, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the whole collection set as one snapshot.
    pub fn save_collections(&self, collections: &[Collection]) -> Result<(), StoreError> {
        self.write_slot(keys::COLLECTIONS_SLOT, Self::serialize(collections)?)
    }

    pub fn defaults_loaded(&self) -> Result<bool, StoreError> {
        Ok(self.read_slot(keys::DEFAULTS_LOADED_SLOT)?.is_some())
    }

    pub fn mark_defaults_loaded(&self) -> Result<(), StoreError> {
        self.write_slot(keys::DEFAULTS_LOADED_SLOT, b"true".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn attempt(timestamp: i64, correct: bool) -> HistoryEntry {
        HistoryEntry::Attempt(AttemptRecord { timestamp, correct })
    }

    #[test]
    fn clean_words_trims_and_drops_blanks() {
        let words = clean_words(["  we ", "", "   ", "see", "we"]);
        assert_eq!(words, vec!["we", "see", "we"]);
    }

    #[test]
    fn attempt_history_evicts_oldest_first() {
        let mut stats = WordStats::new("we");
        for ts in 0..25 {
            stats.push_history(attempt(ts, true));
        }
        assert_eq!(stats.history().len(), ATTEMPT_HISTORY_CAPACITY);
        assert_eq!(stats.attempts().next().unwrap().timestamp, 5);
    }

    #[test]
    fn caps_apply_per_entry_kind() {
        let mut stats = WordStats::new("we");
        for ts in 0..3 {
            stats.push_history(attempt(ts, true));
        }
        for _ in 0..12 {
            stats.push_history(HistoryEntry::Session(SessionRecord {
                correct: 1,
                attempted: 2,
            }));
        }
        assert_eq!(stats.attempts().count(), 3);
        assert_eq!(stats.sessions().count(), SESSION_HISTORY_CAPACITY);
    }

    #[test]
    fn legacy_attempts_field_is_normalized() {
        let raw = r#"{"word":"he","correct":2,"incorrect":1,
            "attempts":[{"timestamp":10,"correct":true},{"timestamp":20,"correct":false}]}"#;
        let stats: WordStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.correct, 2);
        assert_eq!(
            stats.history().iter().copied().collect::<Vec<_>>(),
            vec![attempt(10, true), attempt(20, false)]
        );

        let out = serde_json::to_value(&stats).unwrap();
        assert!(out.get("attempts").is_none());
        assert_eq!(out["history"][0]["kind"], "attempt");
    }

    #[test]
    fn legacy_session_history_is_normalized() {
        let raw = r#"{"word":"she","correct":3,"incorrect":2,
            "history":[{"correct":3,"attempted":5}]}"#;
        let stats: WordStats = serde_json::from_str(raw).unwrap();
        assert_eq!(
            stats.sessions().copied().collect::<Vec<_>>(),
            vec![SessionRecord {
                correct: 3,
                attempted: 5
            }]
        );
    }

    #[test]
    fn counters_only_stats_load_with_empty_history() {
        let stats: WordStats =
            serde_json::from_str(r#"{"word":"my","correct":1,"incorrect":0}"#).unwrap();
        assert!(stats.history().is_empty());
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn keyed_stats_layout_is_accepted() {
        let raw = r#"{"id":"c1","name":"n","words":["a"],
            "stats":{"a":{"correct":1,"incorrect":1}}}"#;
        let collection: Collection = serde_json::from_str(raw).unwrap();
        let stats = collection.word_stats("a").unwrap();
        assert_eq!(stats.word, "a");
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn absent_stats_stay_absent() {
        let collection: Collection =
            serde_json::from_str(r#"{"id":"c1","name":"n","words":["a"]}"#).unwrap();
        assert!(collection.stats.is_none());
        let out = serde_json::to_value(&collection).unwrap();
        assert!(out.get("stats").is_none());
    }

    #[test]
    fn word_stats_mut_creates_orphan_entries() {
        let mut collection = Collection {
            id: "c1".into(),
            name: "n".into(),
            words: vec!["a".into()],
            stats: None,
        };
        collection.word_stats_mut("zzz").correct += 1;
        let stats = collection.stats.as_ref().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(collection.word_stats("zzz").unwrap().correct, 1);
    }

    #[test]
    fn save_and_read_collections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("collections-db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        assert!(store.read_collections().unwrap().is_none());

        let collections = vec![Collection {
            id: "c1".into(),
            name: "List".into(),
            words: vec!["the".into()],
            stats: None,
        }];
        store.save_collections(&collections).unwrap();
        assert_eq!(store.read_collections().unwrap().unwrap(), collections);
    }

    #[test]
    fn corrupt_slot_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt-db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        store
            .write_slot(keys::COLLECTIONS_SLOT, b"{not json".to_vec())
            .unwrap();
        assert!(store.load_collections().is_empty());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial-db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        let raw = br#"[{"id":"ok","name":"Good","words":["a"]},{"name":42},"junk"]"#;
        store.write_slot(keys::COLLECTIONS_SLOT, raw.to_vec()).unwrap();

        let loaded = store.load_collections();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "ok");
    }

    #[test]
    fn defaults_flag_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flag-db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        assert!(!store.defaults_loaded().unwrap());
        store.mark_defaults_loaded().unwrap();
        assert!(store.defaults_loaded().unwrap());
    }
}
