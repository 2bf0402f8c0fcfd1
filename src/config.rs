use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_SNAPSHOT_BYTES};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub max_snapshot_bytes: usize,
    pub share_base_url: String,
    pub defaults: DefaultsConfig,
}

/// Where the bundled default collections come from on first run.
/// An empty `url` means "seed the built-in sample collection instead".
#[derive(Debug, Clone)]
pub struct DefaultsConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/flashcards.sled"),
            max_snapshot_bytes: env_or_parse("MAX_SNAPSHOT_BYTES", DEFAULT_MAX_SNAPSHOT_BYTES),
            share_base_url: env_or("SHARE_BASE_URL", "http://localhost:5173/sightwords"),
            defaults: DefaultsConfig {
                url: env_or("DEFAULTS_URL", ""),
                timeout_secs: env_or_parse("DEFAULTS_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
