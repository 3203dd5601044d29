//! Per-visitor client storage kept in the server session.
//!
//! The whole key/value map is stored under one session key. Handlers take
//! a [`SessionStorage`] extractor, work on the in-memory snapshot through
//! the [`ClientStorage`] trait, and call [`SessionStorage::save`] once at the
//! end. Nothing is written when nothing changed.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use shopfront_core::storage::{ClientStorage, MemoryStorage, StorageError};

use crate::error::AppError;
use crate::models::session_keys;

/// Upper bound on the serialized size of one visitor's storage.
pub const STORAGE_QUOTA_BYTES: usize = 256 * 1024;

/// Client storage snapshot bound to a session.
#[derive(Debug)]
pub struct SessionStorage {
    session: Session,
    items: MemoryStorage,
    dirty: bool,
}

impl SessionStorage {
    /// Read the snapshot from `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: Session) -> Result<Self, tower_sessions::session::Error> {
        let map: HashMap<String, String> = session
            .get(session_keys::CLIENT_STORAGE)
            .await?
            .unwrap_or_default();

        Ok(Self {
            session,
            items: MemoryStorage::from_map(map).limited_to(STORAGE_QUOTA_BYTES),
            dirty: false,
        })
    }

    /// Write the snapshot back if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn save(self) -> Result<(), tower_sessions::session::Error> {
        if !self.dirty {
            return Ok(());
        }
        let Self { session, items, .. } = self;
        session
            .insert(session_keys::CLIENT_STORAGE, items.into_map())
            .await
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the snapshot differs from what was loaded.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl ClientStorage for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if self.items.get_item(key).as_deref() == Some(value.as_str()) {
            return Ok(());
        }
        self.items.set_item(key, value)?;
        self.dirty = true;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        if self.items.get_item(key).is_some() {
            self.items.remove_item(key);
            self.dirty = true;
        }
    }
}

impl<S> FromRequestParts<S> for SessionStorage
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(format!("session layer missing: {msg}")))?;
        Ok(Self::load(session).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_round_trip_through_session() {
        let session = session();
        let mut storage = SessionStorage::load(session.clone()).await.unwrap();
        assert!(!storage.is_dirty());

        storage.set_item("cart", "[]".into()).unwrap();
        assert!(storage.is_dirty());
        storage.save().await.unwrap();

        let reloaded = SessionStorage::load(session).await.unwrap();
        assert_eq!(reloaded.get_item("cart").as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_unchanged_writes_stay_clean() {
        let session = session();
        let mut storage = SessionStorage::load(session.clone()).await.unwrap();
        storage.remove_item("missing");
        assert!(!storage.is_dirty());

        storage.set_item("k", "v".into()).unwrap();
        storage.save().await.unwrap();

        let mut again = SessionStorage::load(session).await.unwrap();
        again.set_item("k", "v".into()).unwrap();
        assert!(!again.is_dirty());
    }

    #[tokio::test]
    async fn test_quota_is_enforced() {
        let mut storage = SessionStorage::load(session()).await.unwrap();
        let err = storage
            .set_item("big", "x".repeat(STORAGE_QUOTA_BYTES + 1))
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(!storage.is_dirty());
    }
}
