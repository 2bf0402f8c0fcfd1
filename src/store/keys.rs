pub const COLLECTIONS_SLOT: &str = "flashcards-collections";
pub const SETTINGS_SLOT: &str = "flashcards-settings";
pub const DEFAULTS_LOADED_SLOT: &str = "flashcards-defaults-loaded";

pub const SCHEMA_VERSION_KEY: &str = "_meta:version";
