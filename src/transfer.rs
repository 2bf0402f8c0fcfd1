//! Export, share-link encoding and decoding of collection data.
//!
//! A share link carries one payload as base64 JSON in a single query parameter:
//!
//! - `{base}/#/importStats?data=..` for stats-only payloads
//! - `{base}/#/importCollections?data=..` for full collection backups
//! - `{base}/addCollections?collections=..` for the legacy `[{name, words}]` lists
//!
//! Input arriving here is untrusted. Decoding never panics; every failure comes
//! back as a [`TransferError`].

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::{
    DATA_VERSION, IMPORT_COLLECTIONS_ROUTE, IMPORT_STATS_ROUTE, LEGACY_SHARE_PARAM,
    LEGACY_SHARE_ROUTE, SHARE_DATA_PARAM,
};
use crate::store::operations::collections::{Collection, WordStats};
use crate::validation::{validate_import_payload, validate_shared_collections, ValidationError};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Stats,
    Collections,
}

impl PayloadKind {
    pub fn route(self) -> &'static str {
        match self {
            PayloadKind::Stats => IMPORT_STATS_ROUTE,
            PayloadKind::Collections => IMPORT_COLLECTIONS_ROUTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatsExport {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stats: Vec<WordStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExportPayload {
    #[serde(rename_all = "camelCase")]
    Stats {
        version: String,
        #[serde(default)]
        export_date: String,
        collections: Vec<CollectionStatsExport>,
    },
    #[serde(rename_all = "camelCase")]
    Collections {
        version: String,
        #[serde(default)]
        export_date: String,
        collections: Vec<Collection>,
    },
}

impl ExportPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            ExportPayload::Stats { .. } => PayloadKind::Stats,
            ExportPayload::Collections { .. } => PayloadKind::Collections,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            ExportPayload::Stats { version, .. } | ExportPayload::Collections { version, .. } => {
                version
            }
        }
    }

    pub fn collection_count(&self) -> usize {
        match self {
            ExportPayload::Stats { collections, .. } => collections.len(),
            ExportPayload::Collections { collections, .. } => collections.len(),
        }
    }
}

/// Entry of the legacy share-link format (no ids, no stats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCollection {
    pub name: String,
    #[serde(default)]
    pub words: Vec<String>,
}

/// Anything an inbound link can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPayload {
    Export(ExportPayload),
    Shared(Vec<SharedCollection>),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to decode or parse data")]
    Decode,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Unrecognized share link")]
    UnrecognizedLink,
    #[error("Share link has no data")]
    MissingData,
    #[error("Invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

fn export_date_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stats-only export, for sharing progress. Never-practiced collections export an empty list.
pub fn export_stats(collections: &[Collection]) -> ExportPayload {
    ExportPayload::Stats {
        version: DATA_VERSION.to_string(),
        export_date: export_date_now(),
        collections: collections
            .iter()
            .map(|c| CollectionStatsExport {
                id: c.id.clone(),
                name: c.name.clone(),
                stats: c.stats.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

/// Full export, for backup or moving to another device.
pub fn export_full(collections: &[Collection]) -> ExportPayload {
    ExportPayload::Collections {
        version: DATA_VERSION.to_string(),
        export_date: export_date_now(),
        collections: collections.to_vec(),
    }
}

pub fn to_json_string(payload: &ExportPayload, pretty: bool) -> Result<String, TransferError> {
    let text = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    Ok(text)
}

/// Transport encoding only: compact JSON, then unpadded URL-safe base64.
pub fn encode(payload: &ExportPayload) -> Result<String, TransferError> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?))
}

pub fn encode_for_share(payload: &ExportPayload, base_url: &str) -> Result<String, TransferError> {
    let encoded = encode(payload)?;
    Ok(format!(
        "{}/#/{}?{}={}",
        base_url.trim_end_matches('/'),
        payload.kind().route(),
        SHARE_DATA_PARAM,
        encoded
    ))
}

/// Build a legacy `addCollections` link carrying only names and words.
pub fn encode_legacy_share(
    collections: &[Collection],
    base_url: &str,
) -> Result<String, TransferError> {
    let shared: Vec<SharedCollection> = collections
        .iter()
        .map(|c| SharedCollection {
            name: c.name.clone(),
            words: c.words.clone(),
        })
        .collect();
    let encoded = STANDARD.encode(serde_json::to_vec(&shared)?);

    let raw = format!("{}/{}", base_url.trim_end_matches('/'), LEGACY_SHARE_ROUTE);
    let mut url =
        reqwest::Url::parse(&raw).map_err(|e| TransferError::InvalidBaseUrl(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair(LEGACY_SHARE_PARAM, &encoded);
    Ok(url.to_string())
}

fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    // Query decoding may have turned '+' into ' '.
    let cleaned: String = encoded
        .trim()
        .chars()
        .map(|c| if c == ' ' { '+' } else { c })
        .filter(|c| !c.is_whitespace())
        .collect();
    STANDARD_LENIENT
        .decode(&cleaned)
        .or_else(|_| URL_SAFE_LENIENT.decode(&cleaned))
        .ok()
}

fn decode_json(encoded: &str) -> Result<Value, TransferError> {
    let bytes = decode_base64(encoded).ok_or(TransferError::Decode)?;
    // Links produced by btoa() are Latin-1, not UTF-8.
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => error.into_bytes().into_iter().map(char::from).collect(),
    };
    serde_json::from_str(&text).map_err(|_| TransferError::Decode)
}

/// Reverse [`encode`], then validate. Only validated payloads are returned.
pub fn decode(encoded: &str) -> Result<ExportPayload, TransferError> {
    let value = decode_json(encoded)?;
    validate_import_payload(&value)?;
    serde_json::from_value(value).map_err(|error| {
        tracing::debug!(error = %error, "Validated payload failed typed parse");
        TransferError::Decode
    })
}

pub fn decode_legacy(encoded: &str) -> Result<Vec<SharedCollection>, TransferError> {
    let value = decode_json(encoded)?;
    validate_shared_collections(&value)?;
    serde_json::from_value(value).map_err(|_| TransferError::Decode)
}

/// Decode any recognized inbound link, current or legacy.
pub fn decode_share_url(link: &str) -> Result<ImportPayload, TransferError> {
    let parsed = reqwest::Url::parse(link.trim()).map_err(|_| TransferError::UnrecognizedLink)?;

    // Hash-routed links keep their route and query inside the fragment.
    let routed = match parsed.fragment() {
        Some(fragment) if fragment.starts_with('/') => parsed
            .join(fragment)
            .map_err(|_| TransferError::UnrecognizedLink)?,
        _ => parsed.clone(),
    };

    let route = routed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or(TransferError::UnrecognizedLink)?
        .to_string();

    let param = |name: &str| {
        routed
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .ok_or(TransferError::MissingData)
    };

    match route.as_str() {
        IMPORT_STATS_ROUTE | IMPORT_COLLECTIONS_ROUTE => {
            let payload = decode(&param(SHARE_DATA_PARAM)?)?;
            if payload.kind().route() != route {
                tracing::warn!(%route, kind = ?payload.kind(), "Share link route does not match payload type");
            }
            Ok(ImportPayload::Export(payload))
        }
        LEGACY_SHARE_ROUTE => Ok(ImportPayload::Shared(decode_legacy(&param(
            LEGACY_SHARE_PARAM,
        )?)?)),
        _ => Err(TransferError::UnrecognizedLink),
    }
}
