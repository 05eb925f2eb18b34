pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::credential::{CredentialRecord, NewCredential};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate hash, or a
    /// second `system` row).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for API token records. Pure storage access, no business rules.
///
/// Lookups return `Ok(None)` when nothing matches; callers decide whether
/// that is a `NotFound` or an `InvalidToken`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, new: &NewCredential) -> Result<CredentialRecord, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError>;

    async fn get_by_name(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn get_by_secret_hash(&self, hash: &str)
        -> Result<Option<CredentialRecord>, StoreError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError>;

    /// Persist the mutable fields of `record` and bump `updated_at`.
    /// Returns the number of rows written; 0 when the record is gone.
    async fn update(&self, record: &CredentialRecord) -> Result<u64, StoreError>;

    /// Returns the number of rows removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError>;
}

/// Run a store call with a hard deadline.
///
/// Dropping the inner future on expiry cancels the call; the elapsed
/// deadline surfaces as [`StoreError::Timeout`] so callers can treat it as
/// a transient storage failure.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(StoreError::Timeout(timeout)))
}
