use crate::store::keys;
use crate::store::{Store, StoreError};

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_canonical_history", m002_canonical_history),
    ]
}

/// Apply every migration newer than the stored schema version.
///
/// - Each migration must be idempotent: a crash between `func()` and
///   `set_version()` re-runs it on the next start.
/// - The version is persisted after each successful migration.
/// - Forward only: `set_version` refuses to downgrade.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn latest_version() -> u32 {
    migrations().len() as u32
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(keys::SCHEMA_VERSION_KEY.as_bytes())? {
        Some(raw) => {
            if raw.len() == 4 {
                let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
                Ok(u32::from_be_bytes(bytes))
            } else {
                let text = String::from_utf8(raw.to_vec()).unwrap_or_else(|_| "0".to_string());
                Ok(text.parse::<u32>().unwrap_or(0))
            }
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(keys::SCHEMA_VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    store.flush()?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

// Rewrites legacy `attempts` arrays and untagged session entries into the tagged
// `history` layout. Reading already normalizes, so this only settles the bytes on disk.
fn m002_canonical_history(store: &Store) -> Result<(), StoreError> {
    let collections = match store.read_collections() {
        Ok(Some(collections)) => collections,
        Ok(None) => return Ok(()),
        Err(StoreError::Serialization(error)) => {
            tracing::warn!(error = %error, "Collections slot unreadable, leaving it untouched");
            return Ok(());
        }
        Err(error) => return Err(error),
    };
    match store.save_collections(&collections) {
        Err(StoreError::CapacityExceeded { size, limit, .. }) => {
            tracing::warn!(size, limit, "Canonical snapshot over capacity, keeping legacy bytes");
            Ok(())
        }
        other => other,
    }
}
