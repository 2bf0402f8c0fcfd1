//! Structural checks for untrusted import data (share links, backup files).
//! Every check returns the first failure found; nothing is partially recovered.

use serde_json::Value;
use thiserror::Error;

use crate::transfer::PayloadKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid data format")]
    InvalidFormat,
    #[error("Missing or invalid version")]
    InvalidVersion,
    #[error("Invalid data type (must be \"stats\" or \"collections\")")]
    InvalidType,
    #[error("Missing or empty collections array")]
    MissingCollections,
    #[error("Collection entry {index} is not an object")]
    EntryNotObject { index: usize },
    #[error("Collection entry {index} is missing an id")]
    MissingId { index: usize },
    #[error("Collection entry {index} is missing a name")]
    MissingName { index: usize },
    #[error("Stats collection entry {index} is missing a stats array")]
    MissingStats { index: usize },
    #[error("Collection entry {index} is missing a words array")]
    MissingWords { index: usize },
}

fn non_empty_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

/// Validate a parsed export payload and report which kind it is.
pub fn validate_import_payload(data: &Value) -> Result<PayloadKind, ValidationError> {
    let obj = data.as_object().ok_or(ValidationError::InvalidFormat)?;

    if !non_empty_str(obj.get("version")) {
        return Err(ValidationError::InvalidVersion);
    }

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some("stats") => PayloadKind::Stats,
        Some("collections") => PayloadKind::Collections,
        _ => return Err(ValidationError::InvalidType),
    };

    let entries = match obj.get("collections").and_then(Value::as_array) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return Err(ValidationError::MissingCollections),
    };

    for (index, entry) in entries.iter().enumerate() {
        let entry = entry
            .as_object()
            .ok_or(ValidationError::EntryNotObject { index })?;
        if !non_empty_str(entry.get("id")) {
            return Err(ValidationError::MissingId { index });
        }
        if !non_empty_str(entry.get("name")) {
            return Err(ValidationError::MissingName { index });
        }
        match kind {
            PayloadKind::Stats => {
                if !entry.get("stats").is_some_and(Value::is_array) {
                    return Err(ValidationError::MissingStats { index });
                }
            }
            PayloadKind::Collections => {
                if !entry.get("words").is_some_and(Value::is_array) {
                    return Err(ValidationError::MissingWords { index });
                }
            }
        }
    }

    Ok(kind)
}

/// Validate the legacy share format: a bare, non-empty array of `{name, words}`.
pub fn validate_shared_collections(data: &Value) -> Result<(), ValidationError> {
    let entries = match data.as_array() {
        Some(entries) if !entries.is_empty() => entries,
        Some(_) => return Err(ValidationError::MissingCollections),
        None => return Err(ValidationError::InvalidFormat),
    };
    for (index, entry) in entries.iter().enumerate() {
        let entry = entry
            .as_object()
            .ok_or(ValidationError::EntryNotObject { index })?;
        if !non_empty_str(entry.get("name")) {
            return Err(ValidationError::MissingName { index });
        }
        if !entry.get("words").is_some_and(Value::is_array) {
            return Err(ValidationError::MissingWords { index });
        }
    }
    Ok(())
}
