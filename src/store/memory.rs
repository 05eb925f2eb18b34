use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::credential::{CredentialRecord, NewCredential, SYSTEM_TOKEN_NAME};

/// In-process credential store with the same uniqueness rules as the
/// `api_tokens` table. Used by tests and by local runs without PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<Uuid, CredentialRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create(&self, new: &NewCredential) -> Result<CredentialRecord, StoreError> {
        let mut records = self.records.write().await;

        if records.values().any(|r| r.token_hash == new.token_hash) {
            return Err(StoreError::Conflict("duplicate token_hash".into()));
        }
        if new.name == SYSTEM_TOKEN_NAME && records.values().any(|r| r.name == SYSTEM_TOKEN_NAME)
        {
            return Err(StoreError::Conflict("system token already exists".into()));
        }

        let now = Utc::now();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            description: new.description.clone(),
            token_hash: new.token_hash.clone(),
            is_active: true,
            is_system: false,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let records = self.records.read().await;
        // Oldest match first, like `ORDER BY created_at LIMIT 1`.
        Ok(records
            .values()
            .filter(|r| r.name == name)
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn get_by_secret_hash(
        &self,
        hash: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.token_hash == hash).cloned())
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update(&self, record: &CredentialRecord) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        // Like an UPDATE ... WHERE id = $1: a missing row is not an error.
        let Some(existing) = records.get_mut(&record.id) else {
            return Ok(0);
        };
        existing.name = record.name.clone();
        existing.description = record.description.clone();
        existing.is_active = record.is_active;
        existing.is_system = record.is_system;
        existing.expires_at = record.expires_at;
        existing.updated_at = Utc::now();
        Ok(1)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError> {
        Ok(self.records.write().await.remove(&id).map_or(0, |_| 1))
    }
}
