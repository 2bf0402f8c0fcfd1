use chrono::Utc;
use serde::Serialize;

use crate::repository::CollectionRepository;
use crate::store::operations::collections::{
    AttemptRecord, HistoryEntry, SessionRecord, WordStats,
};

/// Aggregate counters across every tracked word of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub correct: u64,
    pub incorrect: u64,
    pub percentage: u32,
    pub words_practiced: usize,
}

/// Share of correct answers, rounded to a whole percent. 0 when nothing was attempted.
pub fn percentage(stats: &WordStats) -> u32 {
    ratio_percent(stats.correct, stats.total())
}

fn ratio_percent(correct: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let ratio = (correct.min(total) as f64 / total as f64) * 100.0;
    ratio.round() as u32
}

impl CollectionRepository {
    /// Create zeroed stats for every current word if the collection has none.
    /// Returns false only for an unknown id.
    pub fn ensure_stats_initialized(&mut self, collection_id: &str) -> bool {
        let Some(collection) = self.collection_mut(collection_id) else {
            return false;
        };
        if collection.ensure_stats() {
            self.persist();
        }
        true
    }

    pub fn record_attempt(&mut self, collection_id: &str, word: &str, correct: bool) -> bool {
        self.record_attempt_at(collection_id, word, correct, Utc::now().timestamp_millis())
    }

    pub fn record_attempt_at(
        &mut self,
        collection_id: &str,
        word: &str,
        correct: bool,
        timestamp: i64,
    ) -> bool {
        let Some(collection) = self.collection_mut(collection_id) else {
            tracing::debug!(%collection_id, "Attempt for unknown collection ignored");
            return false;
        };
        let stats = collection.word_stats_mut(word);
        stats.push_history(HistoryEntry::Attempt(AttemptRecord { timestamp, correct }));
        if correct {
            stats.correct = stats.correct.saturating_add(1);
        } else {
            stats.incorrect = stats.incorrect.saturating_add(1);
        }
        self.persist();
        true
    }

    /// Record one practice session for a word. Callers guarantee
    /// `correct_count <= attempted_count`; a violation is logged and the
    /// incorrect delta clamps to zero.
    pub fn record_session(
        &mut self,
        collection_id: &str,
        word: &str,
        correct_count: u64,
        attempted_count: u64,
    ) -> bool {
        if correct_count > attempted_count {
            tracing::warn!(%collection_id, word, correct_count, attempted_count, "Session reports more correct than attempted");
        }
        let Some(collection) = self.collection_mut(collection_id) else {
            return false;
        };
        let stats = collection.word_stats_mut(word);
        stats.push_history(HistoryEntry::Session(SessionRecord {
            correct: correct_count,
            attempted: attempted_count,
        }));
        stats.correct = stats.correct.saturating_add(correct_count);
        stats.incorrect = stats
            .incorrect
            .saturating_add(attempted_count.saturating_sub(correct_count));
        self.persist();
        true
    }

    pub fn word_stats(&self, collection_id: &str, word: &str) -> Option<&WordStats> {
        self.get_by_id(collection_id)?.word_stats(word)
    }

    /// Last `limit` history entries of a word, oldest first.
    pub fn recent_history(&self, collection_id: &str, word: &str, limit: usize) -> Vec<HistoryEntry> {
        let Some(stats) = self.word_stats(collection_id, word) else {
            return Vec::new();
        };
        let history = stats.history();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).copied().collect()
    }

    /// Running accuracy over the most recent `limit` timestamped attempts of the
    /// whole collection. Point `i` is the accuracy of attempts `0..=i` of that
    /// window, not a moving average. Session entries have no timestamp and are
    /// not part of the trend.
    pub fn collection_trend(&self, collection_id: &str, limit: usize) -> Vec<f64> {
        let Some(stats) = self.get_by_id(collection_id).and_then(|c| c.stats.as_ref()) else {
            return Vec::new();
        };

        let mut attempts: Vec<AttemptRecord> =
            stats.iter().flat_map(|s| s.attempts().copied()).collect();
        attempts.sort_by_key(|a| a.timestamp);
        let window = &attempts[attempts.len().saturating_sub(limit)..];

        let mut correct = 0usize;
        window
            .iter()
            .enumerate()
            .map(|(i, attempt)| {
                if attempt.correct {
                    correct += 1;
                }
                correct as f64 / (i + 1) as f64 * 100.0
            })
            .collect()
    }

    /// Session totals aligned by session index across words: point `i` sums the
    /// `i`-th session of every word that has one. Returns the last `limit` points.
    pub fn collection_sessions(&self, collection_id: &str, limit: usize) -> Vec<SessionRecord> {
        let Some(stats) = self.get_by_id(collection_id).and_then(|c| c.stats.as_ref()) else {
            return Vec::new();
        };

        let per_word: Vec<Vec<SessionRecord>> = stats
            .iter()
            .map(|s| s.sessions().copied().collect())
            .collect();
        let longest = per_word.iter().map(Vec::len).max().unwrap_or(0);

        let totals: Vec<SessionRecord> = (0..longest)
            .map(|i| {
                per_word
                    .iter()
                    .filter_map(|sessions| sessions.get(i))
                    .fold(SessionRecord::default(), |acc, s| SessionRecord {
                        correct: acc.correct.saturating_add(s.correct),
                        attempted: acc.attempted.saturating_add(s.attempted),
                    })
            })
            .collect();

        let skip = totals.len().saturating_sub(limit);
        totals.into_iter().skip(skip).collect()
    }

    pub fn collection_summary(&self, collection_id: &str) -> Option<CollectionSummary> {
        let collection = self.get_by_id(collection_id)?;
        let Some(stats) = collection.stats.as_ref() else {
            return Some(CollectionSummary::default());
        };
        let correct = stats.iter().fold(0u64, |acc, s| acc.saturating_add(s.correct));
        let incorrect = stats.iter().fold(0u64, |acc, s| acc.saturating_add(s.incorrect));
        Some(CollectionSummary {
            correct,
            incorrect,
            percentage: ratio_percent(correct, correct.saturating_add(incorrect)),
            words_practiced: stats.iter().filter(|s| s.total() > 0).count(),
        })
    }
}
