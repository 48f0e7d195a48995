//! Snapshot persistence for the guest registry and the payment list.
//!
//! Both collections are written as complete JSON documents on every
//! committed mutation. Writes go to a temp file in the same directory and
//! are renamed into place, so a crash mid-write never truncates the
//! previous snapshot. Safe only under a single concurrent writer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::registry::GuestRecord;

/// Backend-agnostic store for guest profiles and payment counters.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Load the full guest registry. Missing or unreadable snapshots
    /// degrade to an empty registry (logged), never an error.
    async fn load_guests(&self) -> HashMap<i64, GuestRecord>;

    /// Overwrite the guest snapshot with the given registry.
    async fn commit_guests(&self, guests: &HashMap<i64, GuestRecord>) -> Result<(), StoreError>;

    /// Load the payment list: stringified user id → confirmation counter.
    async fn load_payments(&self) -> HashMap<String, u32>;

    /// Overwrite the payment snapshot.
    async fn commit_payments(&self, payments: &HashMap<String, u32>) -> Result<(), StoreError>;
}

/// JSON-file-backed store.
pub struct JsonFileStore {
    guests_path: PathBuf,
    payments_path: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating parent directories as needed.
    pub async fn open(guests_path: PathBuf, payments_path: PathBuf) -> Result<Self, StoreError> {
        for path in [&guests_path, &payments_path] {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await.map_err(|source| {
                    StoreError::PersistenceFailure {
                        path: dir.display().to_string(),
                        source,
                    }
                })?;
            }
        }
        Ok(Self {
            guests_path,
            payments_path,
        })
    }

    async fn load_map<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read snapshot");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to decode snapshot");
                None
            }
        }
    }

    async fn write_snapshot<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value)?;
        // Temp file in the same directory so the rename stays on one filesystem.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| StoreError::PersistenceFailure {
                path: tmp.display().to_string(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| StoreError::PersistenceFailure {
                path: path.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl GuestStore for JsonFileStore {
    async fn load_guests(&self) -> HashMap<i64, GuestRecord> {
        Self::load_map(&self.guests_path).await.unwrap_or_default()
    }

    async fn commit_guests(&self, guests: &HashMap<i64, GuestRecord>) -> Result<(), StoreError> {
        Self::write_snapshot(&self.guests_path, guests).await
    }

    async fn load_payments(&self) -> HashMap<String, u32> {
        Self::load_map(&self.payments_path).await.unwrap_or_default()
    }

    async fn commit_payments(&self, payments: &HashMap<String, u32>) -> Result<(), StoreError> {
        Self::write_snapshot(&self.payments_path, payments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(
            dir.path().join("guests.json"),
            dir.path().join("valid_payments.json"),
        )
        .await
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let (_dir, store) = temp_store().await;
        assert!(store.load_guests().await.is_empty());
        assert!(store.load_payments().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let (dir, store) = temp_store().await;
        tokio::fs::write(dir.path().join("guests.json"), b"{not json")
            .await
            .unwrap();
        assert!(store.load_guests().await.is_empty());
    }

    #[tokio::test]
    async fn guest_round_trip_reproduces_every_field() {
        let (_dir, store) = temp_store().await;

        let mut guests = HashMap::new();
        let mut alice = GuestRecord::new(438251622, Some("alice"), "Алиса");
        alice.full_name = Some("Ёлкина Алиса Петровна".into());
        alice.university = Some("МГУ".into());
        alice.faculty = Some("Социальные науки".into());
        alice.info_source = Some("Из соцсетей".into());
        alice.confirmed = true;
        alice.payment_checks = 2;
        guests.insert(alice.user_id, alice);
        // A record with every optional field unset.
        let bob = GuestRecord::new(99, None, "Боб");
        guests.insert(bob.user_id, bob);

        store.commit_guests(&guests).await.unwrap();
        let loaded = store.load_guests().await;
        assert_eq!(loaded, guests);
    }

    #[tokio::test]
    async fn payments_round_trip_uses_string_keys() {
        let (dir, store) = temp_store().await;

        let mut payments = HashMap::new();
        payments.insert("438251622".to_string(), 3u32);
        store.commit_payments(&payments).await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join("valid_payments.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["438251622"], 3);

        assert_eq!(store.load_payments().await, payments);
    }

    #[tokio::test]
    async fn commit_overwrites_previous_snapshot() {
        let (_dir, store) = temp_store().await;

        let mut guests = HashMap::new();
        guests.insert(1, GuestRecord::new(1, Some("a"), "A"));
        guests.insert(2, GuestRecord::new(2, Some("b"), "B"));
        store.commit_guests(&guests).await.unwrap();

        guests.remove(&2);
        store.commit_guests(&guests).await.unwrap();

        let loaded = store.load_guests().await;
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&1));
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let (dir, store) = temp_store().await;
        store.commit_guests(&HashMap::new()).await.unwrap();
        assert!(!dir.path().join("guests.json.tmp").exists());
        assert!(dir.path().join("guests.json").exists());
    }
}
