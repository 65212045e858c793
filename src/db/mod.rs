// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key-value store layer.
//!
//! Every persisted value in the service (cache entries, the activity store,
//! the call counter) lives behind the [`KvStore`] trait. Two backends exist:
//! Firestore for production and an in-memory map for local runs and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreKv;
pub use memory::MemoryKv;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Store key names as constants.
pub mod keys {
    /// Persisted activity history.
    pub const STRAVA_ACTIVITIES: &str = "strava_activities";
    /// Total API calls served.
    pub const API_CALLS: &str = "api_calls";
}

/// Errors raised by a key-value backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value for '{key}' is malformed: {reason}")]
    Malformed { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal key-value store contract.
///
/// Writes are independent last-writer-wins operations; there is no
/// transaction spanning several calls.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Replace the value at `key`, optionally expiring it after `ttl`.
    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically add one to the integer at `key` (absent counts as 0)
    /// and return the new value.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;
}

/// Typed helpers on top of [`KvStore`].
#[async_trait]
pub trait KvStoreExt: KvStore {
    /// Read and deserialize a value.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Malformed {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serialize and store a value.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), StoreError>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
