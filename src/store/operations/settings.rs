use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Practice options consumed by the practice UI. The core only stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PracticeSettings {
    pub shuffle_words: bool,
    pub recycle_incorrect: bool,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            shuffle_words: true,
            recycle_incorrect: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSettingsPatch {
    #[serde(default)]
    pub shuffle_words: Option<bool>,
    #[serde(default)]
    pub recycle_incorrect: Option<bool>,
}

impl PracticeSettings {
    pub fn apply(&mut self, patch: PracticeSettingsPatch) {
        if let Some(v) = patch.shuffle_words {
            self.shuffle_words = v;
        }
        if let Some(v) = patch.recycle_incorrect {
            self.recycle_incorrect = v;
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    practice: PracticeSettings,
}

impl Store {
    /// Stored settings merged over the defaults. Unreadable data falls back to defaults.
    pub fn get_practice_settings(&self) -> Result<PracticeSettings, StoreError> {
        let settings = match self.read_slot(keys::SETTINGS_SLOT)? {
            Some(raw) => match serde_json::from_slice::<SettingsDocument>(&raw) {
                Ok(doc) => doc.practice,
                Err(error) => {
                    tracing::error!(error = %error, "Failed to deserialize practice settings");
                    PracticeSettings::default()
                }
            },
            None => PracticeSettings::default(),
        };
        Ok(settings)
    }

    pub fn save_practice_settings(&self, settings: &PracticeSettings) -> Result<(), StoreError> {
        let doc = SettingsDocument {
            practice: *settings,
        };
        self.write_slot(keys::SETTINGS_SLOT, Self::serialize(&doc)?)
    }

    pub fn update_practice_settings(
        &self,
        patch: PracticeSettingsPatch,
    ) -> Result<PracticeSettings, StoreError> {
        let mut settings = self.get_practice_settings()?;
        settings.apply(patch);
        self.save_practice_settings(&settings)?;
        Ok(settings)
    }
}
