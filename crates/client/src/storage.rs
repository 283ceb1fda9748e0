//! String key/value storage for the client.
//!
//! Plays the part of browser local storage: the session token, the signed-in
//! user, the guest cart and guest orders are all kept here as JSON strings.
//! [`FileStorage`] persists to a JSON file for the CLI; [`MemoryStorage`]
//! keeps everything in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Well-known storage keys.
pub mod keys {
    pub const GUEST_CART: &str = "guestCart";
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const USER_ORDERS: &str = "userOrders";
}

/// String key/value store.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the change cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Read and decode a JSON value. Missing keys and undecodable values read as `None`.
pub fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring unreadable stored value");
            None
        }
    }
}

/// Encode and store a JSON value.
///
/// # Errors
///
/// Returns `ClientError::Serde` or `ClientError::Storage`.
pub fn write_json<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), ClientError> {
    storage.set(key, &serde_json::to_string(value)?)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Storage backed by one JSON object in a file.
///
/// The whole file is rewritten on every change. The in-memory copy only
/// changes once the write has succeeded.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the file exists but cannot be read,
    /// `ClientError::Serde` if it is not a JSON object of strings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .map_err(|e| ClientError::Storage(format!("cannot write {}: {e}", self.path.display())))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dream_collections_core::{GuestCart, VariantId};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "dream-collections-{name}-{}.json",
            std::process::id()
        ))
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get(keys::TOKEN).is_none());
        storage.set(keys::TOKEN, "abc").unwrap();
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("abc"));
        storage.remove(keys::TOKEN).unwrap();
        storage.remove(keys::TOKEN).unwrap();
        assert!(storage.get(keys::TOKEN).is_none());
    }

    #[test]
    fn test_json_helpers() {
        let storage = MemoryStorage::new();
        let mut cart = GuestCart::default();
        cart.add(VariantId::new(3), 2);
        write_json(&storage, keys::GUEST_CART, &cart).unwrap();

        assert_eq!(
            storage.get(keys::GUEST_CART).as_deref(),
            Some(r#"{"items":[{"productVariantId":3,"quantity":2}],"totalAmount":0.0}"#)
        );
        assert_eq!(read_json::<GuestCart>(&storage, keys::GUEST_CART), Some(cart));

        storage.set(keys::GUEST_CART, "{not json").unwrap();
        assert!(read_json::<GuestCart>(&storage, keys::GUEST_CART).is_none());
    }

    #[test]
    fn test_file_storage_persists_across_opens() {
        let path = temp_path("persist");
        let _ = std::fs::remove_file(&path);

        let storage = FileStorage::open(&path).unwrap();
        storage.set(keys::USER, r#"{"id":1}"#).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(keys::USER).as_deref(), Some(r#"{"id":1}"#));
        reopened.remove(keys::USER).unwrap();
        assert!(FileStorage::open(&path).unwrap().get(keys::USER).is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_entries_unchanged() {
        let path = temp_path("failed-write");
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&path);

        let storage = FileStorage::open(&path).unwrap();
        storage.set(keys::TOKEN, "old").unwrap();

        // A directory in the file's place makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = storage.set(keys::TOKEN, "new").unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("old"));

        assert!(storage.remove(keys::TOKEN).is_err());
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("old"));

        std::fs::remove_dir(&path).unwrap();
    }

    #[test]
    fn test_file_storage_rejects_garbage() {
        let path = temp_path("garbage");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(ClientError::Serde(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
