// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory key-value store.
//!
//! Used for local development and as the test fixture. Entries honour their
//! expiry lazily on read.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// DashMap-backed store shared across clones.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<DashMap<String, Entry>>,
    /// When set, every call fails as if the backend were unreachable.
    offline: Arc<AtomicBool>,
    /// Number of successful `set` calls (handy for asserting write counts).
    writes: Arc<AtomicU64>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with [`StoreError::Unavailable`].
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_offline(true);
        store
    }

    /// Toggle simulated unavailability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Drop `key` only if the entry present at removal time has expired, so a
    /// concurrent `set` between the read and the removal survives.
    fn remove_if_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.check_online()?;

        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_if_expired(key, now);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.check_online()?;

        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.check_online()?;

        let now = Instant::now();
        // The entry guard holds the shard lock, so read-modify-write is atomic.
        let mut entry = self.entries.entry(key.to_string()).or_insert(Entry {
            value: serde_json::Value::from(0),
            expires_at: None,
        });
        if entry.is_expired(now) {
            *entry = Entry {
                value: serde_json::Value::from(0),
                expires_at: None,
            };
        }

        let current = entry.value.as_i64().ok_or_else(|| StoreError::Malformed {
            key: key.to_string(),
            reason: "value is not an integer".to_string(),
        })?;
        let next = current + 1;
        entry.value = serde_json::Value::from(next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryKv::new();
        store.set("k", json!({"a": 1}), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        // Deleting again is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent() {
        let store = MemoryKv::new();
        store
            .set("k", json!(1), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry_purge_keeps_rewritten_entry() {
        let store = MemoryKv::new();
        store
            .set("k", json!(1), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let now = Instant::now();

        // A writer replaces the expired entry before the purge runs.
        store.set("k", json!(2), None).await.unwrap();
        store.remove_if_expired("k", now);
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));

        store
            .set("k", json!(3), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        store.remove_if_expired("k", Instant::now() + Duration::from_secs(1));
        assert!(store.entries.get("k").is_none());
    }

    #[tokio::test]
    async fn test_increment_from_absent() {
        let store = MemoryKv::new();
        assert_eq!(store.increment("c").await.unwrap(), 1);
        assert_eq!(store.increment("c").await.unwrap(), 2);
        assert_eq!(store.get("c").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_increment_rejects_non_integer() {
        let store = MemoryKv::new();
        store.set("c", json!("nope"), None).await.unwrap();
        let err = store.increment("c").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = MemoryKv::unavailable();
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", json!(1), None).await.is_err());
        assert!(store.delete("k").await.is_err());
        assert!(store.increment("k").await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
