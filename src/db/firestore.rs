// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed key-value store.
//!
//! Each key maps to one document in the `kv` collection holding the JSON
//! encoded value and an optional expiry. Expired documents read as absent;
//! nothing sweeps them, the next write simply replaces them.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collection holding one document per key.
const KV_COLLECTION: &str = "kv";

/// Attempts before a contended counter increment gives up.
const INCREMENT_ATTEMPTS: u32 = 5;

/// Stored document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KvDocument {
    /// JSON-encoded value
    value: String,
    /// Expiry (RFC 3339), `None` for keys that never expire
    #[serde(default)]
    expires_at: Option<String>,
}

impl KvDocument {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .is_some_and(|at| now >= at.with_timezone(&Utc))
    }
}

/// Firestore key-value client.
#[derive(Clone)]
pub struct FirestoreKv {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreKv {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("Store not connected (offline mode)".to_string()))
    }

    /// Firestore document IDs cannot contain '/', so keys are URL-encoded.
    fn doc_id(key: &str) -> String {
        urlencoding::encode(key).into_owned()
    }

    async fn read_document(&self, key: &str) -> Result<Option<KvDocument>, StoreError> {
        Self::read_document_with(self.get_client()?, key).await
    }

    /// Read through `db`, which may be bound to a transaction.
    async fn read_document_with(
        db: &firestore::FirestoreDb,
        key: &str,
    ) -> Result<Option<KvDocument>, StoreError> {
        db.fluent()
            .select()
            .by_id_in(KV_COLLECTION)
            .obj()
            .one(&Self::doc_id(key))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl KvStore for FirestoreKv {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let Some(doc) = self.read_document(key).await? else {
            return Ok(None);
        };

        if doc.is_expired(Utc::now()) {
            tracing::debug!(key, "Stored document expired");
            return Ok(None);
        }

        serde_json::from_str(&doc.value)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| (Utc::now() + ttl).to_rfc3339());

        let doc = KvDocument {
            value: serde_json::to_string(&value)?,
            expires_at,
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(KV_COLLECTION)
            .document_id(Self::doc_id(key))
            .object(&doc)
            .execute()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(KV_COLLECTION)
            .document_id(Self::doc_id(key))
            .execute()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    /// Read-modify-write committed through a Firestore transaction.
    ///
    /// The read goes through the transaction so a concurrent increment makes
    /// the commit fail instead of being overwritten; contended commits are
    /// retried from a fresh read.
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut attempt = 1;
        loop {
            match self.try_increment(key).await {
                Err(IncrementError::Contended(e)) if attempt < INCREMENT_ATTEMPTS => {
                    tracing::debug!(key, attempt, error = %e, "Counter commit contended, retrying");
                    attempt += 1;
                }
                Err(IncrementError::Contended(e)) => {
                    return Err(StoreError::Unavailable(format!(
                        "Transaction commit failed after {} attempts: {}",
                        attempt, e
                    )));
                }
                Err(IncrementError::Store(e)) => return Err(e),
                Ok(next) => {
                    tracing::debug!(key, value = next, "Counter incremented");
                    return Ok(next);
                }
            }
        }
    }
}

/// Outcome of one increment attempt that did not commit.
enum IncrementError {
    /// Another writer touched the document; safe to retry.
    Contended(FirestoreError),
    Store(StoreError),
}

impl From<StoreError> for IncrementError {
    fn from(e: StoreError) -> Self {
        IncrementError::Store(e)
    }
}

impl FirestoreKv {
    async fn try_increment(&self, key: &str) -> Result<i64, IncrementError> {
        let client = self.get_client()?;
        let doc_id = Self::doc_id(key);

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to begin transaction: {}", e))
        })?;

        // Reads through this handle register the document with the transaction.
        let in_transaction = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        let current = match Self::read_document_with(&in_transaction, key).await {
            Ok(Some(doc)) if !doc.is_expired(Utc::now()) => {
                match serde_json::from_str::<i64>(&doc.value) {
                    Ok(value) => value,
                    Err(e) => {
                        let _ = transaction.rollback().await;
                        return Err(StoreError::Malformed {
                            key: key.to_string(),
                            reason: e.to_string(),
                        }
                        .into());
                    }
                }
            }
            Ok(_) => 0,
            Err(e) => {
                let _ = transaction.rollback().await;
                return Err(e.into());
            }
        };
        let next = current + 1;

        let doc = KvDocument {
            value: next.to_string(),
            expires_at: None,
        };

        client
            .fluent()
            .update()
            .in_col(KV_COLLECTION)
            .document_id(&doc_id)
            .object(&doc)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to add counter to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(next),
            Err(e) if is_contention(&e) => Err(IncrementError::Contended(e)),
            Err(e) => {
                Err(StoreError::Unavailable(format!("Transaction commit failed: {}", e)).into())
            }
        }
    }
}

/// Aborted commits (another transaction won the document) are retryable.
fn is_contention(e: &FirestoreError) -> bool {
    matches!(e, FirestoreError::DatabaseError(db_err) if db_err.retry_possible)
}
