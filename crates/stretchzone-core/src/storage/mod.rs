mod config;
pub mod database;
pub mod memory;
pub mod write_queue;

pub use config::{Config, PersistenceConfig, RotationConfig, XpConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use write_queue::WriteQueue;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ConfigError, CoreError, Result};

/// Key holding the serialized [`crate::ProgressAggregate`].
pub const PROGRESS_KEY: &str = "progress_aggregate";
/// Key holding the serialized [`crate::ChallengeAssignment`].
pub const ASSIGNMENT_KEY: &str = "challenge_assignment";

/// Durable byte storage. No ordering or atomicity is assumed across keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Returns `~/.config/stretchzone[-dev]/`, or `STRETCHZONE_DATA_DIR` if set.
///
/// Set STRETCHZONE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("STRETCHZONE_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .ok_or_else(|| ConfigError::NoDataDir("home directory not found".into()))?
                .join(".config");
            let env = std::env::var("STRETCHZONE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("stretchzone-dev")
            } else {
                base_dir.join("stretchzone")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Read and decode `key`. Missing, unreadable or corrupt data all come back
/// as `None`; the last two are logged and otherwise swallowed.
pub(crate) async fn load_or_default<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    let bytes = match store.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read persisted state, using defaults");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            let report = CoreError::CorruptPersistedState {
                key: key.to_string(),
                message: e.to_string(),
            };
            tracing::warn!(error = %report, "discarding corrupt persisted state");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgressAggregate;

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let store = MemoryStore::new();
        let loaded: Option<ProgressAggregate> = load_or_default(&store, PROGRESS_KEY).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn corrupt_bytes_load_as_none() {
        let store = MemoryStore::new();
        store.set(PROGRESS_KEY, b"\x00\xffnot json").await.unwrap();
        let loaded: Option<ProgressAggregate> = load_or_default(&store, PROGRESS_KEY).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn encoded_value_loads_back() {
        let store = MemoryStore::new();
        let mut agg = ProgressAggregate::new();
        agg.add_xp(crate::XpAmount::new(77)).unwrap();
        store.set(PROGRESS_KEY, &encode(&agg).unwrap()).await.unwrap();
        let loaded: Option<ProgressAggregate> = load_or_default(&store, PROGRESS_KEY).await;
        assert_eq!(loaded, Some(agg));
    }
}
