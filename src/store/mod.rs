pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

use crate::constants::DEFAULT_MAX_SNAPSHOT_BYTES;

/// Local device storage: named key-value slots plus schema metadata.
///
/// Every slot write replaces the whole value and flushes before returning, so a
/// reader never observes a partially written snapshot.
#[derive(Debug)]
pub struct Store {
    db: Db,
    pub slots: sled::Tree,
    pub meta: sled::Tree,
    max_snapshot_bytes: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("capacity exceeded: slot={slot}, size={size}, limit={limit}")]
    CapacityExceeded {
        slot: String,
        size: usize,
        limit: usize,
    },
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        Self::open_with_limit(sled_path, DEFAULT_MAX_SNAPSHOT_BYTES)
    }

    pub fn open_with_limit(sled_path: &str, max_snapshot_bytes: usize) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let slots = db.open_tree(trees::SLOTS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            slots,
            meta,
            max_snapshot_bytes,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn max_snapshot_bytes(&self) -> usize {
        self.max_snapshot_bytes
    }

    pub(crate) fn read_slot(&self, slot: &str) -> Result<Option<sled::IVec>, StoreError> {
        Ok(self.slots.get(slot.as_bytes())?)
    }

    pub(crate) fn write_slot(&self, slot: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if bytes.len() > self.max_snapshot_bytes {
            return Err(StoreError::CapacityExceeded {
                slot: slot.to_string(),
                size: bytes.len(),
                limit: self.max_snapshot_bytes,
            });
        }
        self.slots.insert(slot.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
