/// Version written into every export payload.
pub const DATA_VERSION: &str = "1.0";

/// Attempt entries kept per word.
pub const ATTEMPT_HISTORY_CAPACITY: usize = 20;

/// Session entries kept per word.
pub const SESSION_HISTORY_CAPACITY: usize = 10;

/// History entries shown per word by default.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Points in a collection trend by default.
pub const DEFAULT_TREND_LIMIT: usize = 10;

/// Snapshot size limit in bytes, sized like a browser localStorage quota.
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 5 * 1_024 * 1_024;

/// Default-collections manifest fetch timeout (seconds).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 8;

/// Largest manifest body accepted.
pub const MAX_MANIFEST_BYTES: usize = 2 * 1_024 * 1_024;

/// Collection seeded on first run when no manifest is configured.
pub const SAMPLE_COLLECTION_NAME: &str = "Sample Words";
pub const SAMPLE_COLLECTION_WORDS: &[&str] = &["we", "see", "my", "he", "she", "with", "said"];

/// Share-link routes and query parameters.
pub const IMPORT_STATS_ROUTE: &str = "importStats";
pub const IMPORT_COLLECTIONS_ROUTE: &str = "importCollections";
pub const LEGACY_SHARE_ROUTE: &str = "addCollections";
pub const SHARE_DATA_PARAM: &str = "data";
pub const LEGACY_SHARE_PARAM: &str = "collections";
