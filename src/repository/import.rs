//! Merging imported data into the repository.
//!
//! Each incoming record is matched by id. What happens on an id conflict is
//! decided by [`ImportPolicy`] and every outcome is listed in the returned
//! [`ImportReport`], so the caller can show what was skipped instead of
//! dropping it silently.

use serde::{Deserialize, Serialize};

use crate::repository::CollectionRepository;
use crate::store::operations::collections::{clean_words, Collection};
use crate::transfer::{CollectionStatsExport, ExportPayload, ImportPayload, SharedCollection};

const IMPORTED_SUFFIX: &str = " (imported)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPolicy {
    /// Keep the local record untouched and report the conflict.
    #[default]
    Skip,
    /// Replace the local record's contents with the imported ones.
    Overwrite,
    /// Keep the local record and add the import under a fresh id.
    KeepBoth,
}

impl std::str::FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ImportPolicy::Skip),
            "overwrite" => Ok(ImportPolicy::Overwrite),
            "keep-both" | "keep_both" | "duplicate" => Ok(ImportPolicy::KeepBoth),
            other => Err(format!("unknown import policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// New collections, or stats applied to a never-practiced collection.
    pub added: Vec<String>,
    pub overwritten: Vec<String>,
    /// `(existing id, id of the new copy)`.
    pub duplicated: Vec<(String, String)>,
    /// Conflicting ids left untouched under [`ImportPolicy::Skip`].
    pub skipped: Vec<String>,
    /// Stats for collections that do not exist locally.
    pub unmatched: Vec<String>,
    /// Set when the import changed something and the save afterwards failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl ImportReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.overwritten.is_empty() || !self.duplicated.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.skipped.is_empty()
    }
}

impl CollectionRepository {
    pub fn apply_import(&mut self, payload: ImportPayload, policy: ImportPolicy) -> ImportReport {
        match payload {
            ImportPayload::Export(ExportPayload::Collections { collections, .. }) => {
                self.import_collections(collections, policy)
            }
            ImportPayload::Export(ExportPayload::Stats { collections, .. }) => {
                self.import_stats(collections, policy)
            }
            ImportPayload::Shared(shared) => self.import_shared(shared),
        }
    }

    /// Import full records. Stats travel with the record.
    pub fn import_collections(
        &mut self,
        incoming: Vec<Collection>,
        policy: ImportPolicy,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for mut record in incoming {
            record.name = record.name.trim().to_string();
            record.words = clean_words(&record.words);
            if record.id.trim().is_empty() {
                record.id = self.generate_id();
            }

            if !self.contains_id(&record.id) {
                report.added.push(record.id.clone());
                self.push_collection(record);
                continue;
            }

            match policy {
                ImportPolicy::Skip => report.skipped.push(record.id),
                ImportPolicy::Overwrite => {
                    if let Some(existing) = self.collection_mut(&record.id) {
                        existing.name = record.name;
                        existing.words = record.words;
                        // A backup without stats does not erase local progress.
                        if record.stats.is_some() {
                            existing.stats = record.stats;
                        }
                    }
                    report.overwritten.push(record.id);
                }
                ImportPolicy::KeepBoth => {
                    let original_id = std::mem::replace(&mut record.id, self.generate_id());
                    record.name = format!("{}{}", record.name, IMPORTED_SUFFIX);
                    report.duplicated.push((original_id, record.id.clone()));
                    self.push_collection(record);
                }
            }
        }

        self.finish_import(&mut report);
        report
    }

    /// Import stats onto existing collections matched by id.
    pub fn import_stats(
        &mut self,
        incoming: Vec<CollectionStatsExport>,
        policy: ImportPolicy,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for entry in incoming {
            let Some(existing) = self.get_by_id(&entry.id) else {
                report.unmatched.push(entry.id);
                continue;
            };

            if existing.stats.is_none() {
                if let Some(collection) = self.collection_mut(&entry.id) {
                    collection.stats = Some(entry.stats);
                }
                report.added.push(entry.id);
                continue;
            }

            match policy {
                ImportPolicy::Skip => report.skipped.push(entry.id),
                ImportPolicy::Overwrite => {
                    if let Some(collection) = self.collection_mut(&entry.id) {
                        collection.stats = Some(entry.stats);
                    }
                    report.overwritten.push(entry.id);
                }
                ImportPolicy::KeepBoth => {
                    let copy = Collection {
                        id: self.generate_id(),
                        name: format!("{}{}", existing.name, IMPORTED_SUFFIX),
                        words: existing.words.clone(),
                        stats: Some(entry.stats),
                    };
                    report.duplicated.push((entry.id, copy.id.clone()));
                    self.push_collection(copy);
                }
            }
        }

        self.finish_import(&mut report);
        report
    }

    /// Legacy share links carry no ids, so every entry becomes a new collection.
    pub fn import_shared(&mut self, shared: Vec<SharedCollection>) -> ImportReport {
        let mut report = ImportReport::default();
        for entry in shared {
            let id = self.generate_id();
            self.push_collection(Collection {
                id: id.clone(),
                name: entry.name.trim().to_string(),
                words: clean_words(&entry.words),
                stats: None,
            });
            report.added.push(id);
        }
        self.finish_import(&mut report);
        report
    }

    fn finish_import(&mut self, report: &mut ImportReport) {
        if report.changed() && !self.persist() {
            report.save_error = self.last_save_error().map(str::to_string);
        }
        tracing::info!(
            added = report.added.len(),
            overwritten = report.overwritten.len(),
            duplicated = report.duplicated.len(),
            skipped = report.skipped.len(),
            unmatched = report.unmatched.len(),
            "Import applied"
        );
    }
}
