use std::time::Duration;

use serde::Deserialize;

use crate::config::DefaultsConfig;
use crate::constants::MAX_MANIFEST_BYTES;
use crate::store::operations::collections::{clean_words, Collection};

/// Fetches the bundled default-collections manifest (`[{id, name, words}]`).
///
/// `url` may be `http(s)://` or `file://`. The whole fetch runs under one timeout.
#[derive(Debug, Clone)]
pub struct DefaultsProvider {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    name: String,
    #[serde(default)]
    words: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("defaults fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("defaults network error: {0}")]
    Network(String),
    #[error("defaults read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("defaults server returned status {0}")]
    Status(u16),
    #[error("defaults manifest too large: {0} bytes")]
    TooLarge(usize),
    #[error("defaults manifest is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DefaultsProvider {
    /// `None` when no manifest url is configured.
    pub fn from_config(config: &DefaultsConfig) -> Option<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            return None;
        }
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        // The whole fetch is bounded in `fetch`; the client only bounds connecting.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Some(Self {
            url: url.to_string(),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<Collection>, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;
        parse_manifest(&bytes)
    }

    async fn fetch_bytes(&self) -> Result<Vec<u8>, FetchError> {
        if let Some(path) = self.url.strip_prefix("file://") {
            let bytes = tokio::fs::read(path).await?;
            return check_size(bytes);
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        if let Some(len) = response.content_length() {
            if len > MAX_MANIFEST_BYTES as u64 {
                return Err(FetchError::TooLarge(len as usize));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        check_size(body.to_vec())
    }
}

/// Accepts connections and never answers them.
#[cfg(test)]
pub(crate) async fn silent_manifest_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/defaults.json")
}

fn check_size(bytes: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    if bytes.len() > MAX_MANIFEST_BYTES {
        return Err(FetchError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Parse a manifest body into never-practiced collections.
pub fn parse_manifest(bytes: &[u8]) -> Result<Vec<Collection>, FetchError> {
    let entries: Vec<ManifestEntry> = serde_json::from_slice(bytes)?;
    Ok(entries
        .into_iter()
        .map(|entry| Collection {
            id: entry.id,
            name: entry.name.trim().to_string(),
            words: clean_words(entry.words),
            stats: None,
        })
        .collect())
}
