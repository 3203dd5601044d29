//! Per-client key/value storage.
//!
//! Everything a visitor's session remembers (resolved store, chosen country,
//! cart lines, login) is kept as JSON strings under well-known keys in a
//! [`ClientStorage`]. The storefront backs this with the HTTP session; tests
//! use [`MemoryStorage`].

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::StoreId;

/// Well-known storage keys.
pub mod keys {
    use crate::types::StoreId;

    /// Logged-in customer (`{token, data}`).
    pub const AUTH_INFO: &str = "authInfo";
    /// Cart line items.
    pub const CART: &str = "cart";
    /// Cached resolved store id.
    pub const STORE_ID: &str = "storeId";
    /// Domain the cached store id was resolved for.
    pub const STORE_DOMAIN: &str = "storeDomain";

    /// Key holding the selected country for a store.
    #[must_use]
    pub fn country(store_id: &StoreId) -> String {
        format!("store_{store_id}_country")
    }
}

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend refused the write because it is full.
    #[error("storage quota exceeded writing {key}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
    },

    /// The value could not be encoded.
    #[error("failed to encode {key}: {source}")]
    Encode {
        /// Key being written.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be decoded.
    #[error("corrupt value under {key}: {source}")]
    Corrupt {
        /// Key being read.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value store scoped to one client.
pub trait ClientStorage {
    /// Read a raw value.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete a value. Absent keys are ignored.
    fn remove_item(&mut self, key: &str);
}

/// Typed JSON helpers on top of any [`ClientStorage`].
pub trait StorageExt: ClientStorage {
    /// Read and decode a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if the stored string is not valid
    /// JSON for `T`. A missing key is `Ok(None)`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.get_item(key)
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                    key: key.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    /// Encode and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the backend rejects the write.
    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.set_item(key, raw)
    }
}

impl<S: ClientStorage + ?Sized> StorageExt for S {}

impl<S: ClientStorage + ?Sized> ClientStorage for &mut S {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) {
        (**self).remove_item(key);
    }
}

/// In-memory storage, optionally with a byte quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create empty, unbounded storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage that rejects writes once the total size of keys and
    /// values would exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Build storage pre-populated from an existing map.
    #[must_use]
    pub const fn from_map(items: HashMap<String, String>) -> Self {
        Self { items, quota: None }
    }

    /// Apply a byte quota to this storage.
    #[must_use]
    pub fn limited_to(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Consume and return the underlying map.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.items
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn used_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl ClientStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(quota) = self.quota
            && self.used_without(key) + key.len() + value.len() > quota
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
            });
        }
        self.items.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// Remove every key scoped to a store (currently just its country choice).
pub fn forget_store_scoped<S: ClientStorage + ?Sized>(storage: &mut S, store_id: &StoreId) {
    storage.remove_item(&keys::country(store_id));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_country_key_format() {
        assert_eq!(keys::country(&StoreId::new("abc")), "store_abc_country");
    }

    #[test]
    fn test_json_roundtrip_and_corruption() {
        let mut storage = MemoryStorage::new();
        storage.set_json("n", &vec![1, 2, 3]).unwrap();
        assert_eq!(storage.get_json::<Vec<i32>>("n").unwrap(), Some(vec![1, 2, 3]));
        assert!(storage.get_json::<Vec<i32>>("missing").unwrap().is_none());

        storage.set_item("bad", "{not json".into()).unwrap();
        assert!(matches!(
            storage.get_json::<Vec<i32>>("bad"),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_quota_rejects_oversized_writes() {
        let mut storage = MemoryStorage::with_quota(10);
        assert!(storage.set_item("k", "12345".into()).is_ok());
        assert!(matches!(
            storage.set_item("other", "123456789".into()),
            Err(StorageError::QuotaExceeded { .. })
        ));
        // Overwriting the same key only counts the new value.
        assert!(storage.set_item("k", "123456789".into()).is_ok());
    }
}
