use std::sync::Arc;
use std::time::Duration;

use super::parse_token_id;
use super::validator::TokenValidator;
use crate::config::AuthSettings;
use crate::errors::AuthError;
use crate::models::credential::CredentialRecord;
use crate::store::{with_deadline, CredentialStore};

/// Soft revocation (`is_active = false`) and hard deletion.
///
/// Nothing here sets `is_active` back to true.
pub struct RevocationManager {
    store: Arc<dyn CredentialStore>,
    validator: Arc<TokenValidator>,
    store_timeout: Duration,
}

impl RevocationManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        validator: Arc<TokenValidator>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            store,
            validator,
            store_timeout: settings.store_timeout,
        }
    }

    /// Revoke the record bound to a presented claim token. Fails with the
    /// validator's error if the token itself does not validate.
    pub async fn revoke_by_presented_token(&self, token: &str) -> Result<(), AuthError> {
        let record = self.validator.validate(token).await?;
        self.deactivate(record).await
    }

    /// Revoke by record id. Revoking an already revoked record succeeds.
    pub async fn revoke_by_id(&self, id: &str) -> Result<(), AuthError> {
        let id = parse_token_id(id)?;
        let record = with_deadline(self.store_timeout, self.store.get_by_id(id))
            .await?
            .ok_or(AuthError::NotFound)?;
        self.deactivate(record).await
    }

    /// Permanently remove a record. System records are refused.
    pub async fn hard_delete(&self, id: &str) -> Result<(), AuthError> {
        let id = parse_token_id(id)?;
        let record = with_deadline(self.store_timeout, self.store.get_by_id(id))
            .await?
            .ok_or(AuthError::NotFound)?;

        if record.is_system {
            tracing::warn!(token_id = %id, "refusing to delete system token");
            return Err(AuthError::ProtectedRecord);
        }

        let rows = with_deadline(self.store_timeout, self.store.delete_by_id(id)).await?;
        if rows == 0 {
            // lost a race with a concurrent delete
            return Err(AuthError::NotFound);
        }

        tracing::info!(token_id = %id, name = %record.name, "deleted API token");
        Ok(())
    }

    async fn deactivate(&self, mut record: CredentialRecord) -> Result<(), AuthError> {
        record.is_active = false;
        let rows = with_deadline(self.store_timeout, self.store.update(&record)).await?;
        if rows == 0 {
            // deleted between the read and the write
            return Err(AuthError::NotFound);
        }
        tracing::info!(token_id = %record.id, name = %record.name, "revoked API token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issuer::TokenIssuer;
    use crate::models::credential::NewCredential;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;
    use uuid::Uuid;

    struct Fixture {
        issuer: TokenIssuer,
        revocation: RevocationManager,
        store: MemoryStore,
    }

    fn setup() -> Fixture {
        let store = MemoryStore::new();
        let settings = AuthSettings::new(b"revocation-secret", Duration::from_secs(3600)).unwrap();
        let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());
        let validator = Arc::new(TokenValidator::new(shared.clone(), &settings));
        Fixture {
            issuer: TokenIssuer::new(shared.clone(), &settings),
            revocation: RevocationManager::new(shared, validator, &settings),
            store,
        }
    }

    #[tokio::test]
    async fn test_revoke_by_presented_token() {
        let f = setup();
        let issued = f.issuer.issue_record("ci-bot", None, None).await.unwrap();
        f.revocation
            .revoke_by_presented_token(&issued.token)
            .await
            .unwrap();

        let stored = f.store.get_by_id(issued.record.id).await.unwrap().unwrap();
        assert!(!stored.is_active);

        // the token is now disabled, so presenting it again fails
        assert_eq!(
            f.revocation
                .revoke_by_presented_token(&issued.token)
                .await
                .unwrap_err()
                .token_reason(),
            Some("token is disabled")
        );
    }

    #[tokio::test]
    async fn test_revoke_by_id_is_idempotent() {
        let f = setup();
        let issued = f.issuer.issue_record("ci-bot", None, None).await.unwrap();
        let id = issued.record.id.to_string();
        f.revocation.revoke_by_id(&id).await.unwrap();
        f.revocation.revoke_by_id(&id).await.unwrap();
        assert!(!f.store.get_by_id(issued.record.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_revoke_unknown_and_malformed_ids() {
        let f = setup();
        assert!(matches!(
            f.revocation.revoke_by_id(&Uuid::new_v4().to_string()).await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            f.revocation.revoke_by_id("42").await,
            Err(AuthError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_hard_delete_once_then_not_found() {
        let f = setup();
        let issued = f.issuer.issue_record("ci-bot", None, None).await.unwrap();
        let id = issued.record.id.to_string();
        f.revocation.hard_delete(&id).await.unwrap();
        assert!(matches!(
            f.revocation.hard_delete(&id).await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_hard_delete_refuses_system_record() {
        let f = setup();
        let mut record = f.issuer.issue_record("system", None, None).await.unwrap().record;
        record.is_system = true;
        f.store.update(&record).await.unwrap();

        assert!(matches!(
            f.revocation.hard_delete(&record.id.to_string()).await,
            Err(AuthError::ProtectedRecord)
        ));
        assert!(f.store.get_by_id(record.id).await.unwrap().is_some());
    }

    /// Hands out the record, then loses it before the write lands.
    struct DeletedMidway {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl CredentialStore for DeletedMidway {
        async fn create(&self, new: &NewCredential) -> Result<CredentialRecord, StoreError> {
            self.inner.create(new).await
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, StoreError> {
            let found = self.inner.get_by_id(id).await?;
            self.inner.delete_by_id(id).await?;
            Ok(found)
        }

        async fn get_by_name(&self, name: &str) -> Result<Option<CredentialRecord>, StoreError> {
            self.inner.get_by_name(name).await
        }

        async fn get_by_secret_hash(
            &self,
            hash: &str,
        ) -> Result<Option<CredentialRecord>, StoreError> {
            self.inner.get_by_secret_hash(hash).await
        }

        async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
            self.inner.list().await
        }

        async fn update(&self, record: &CredentialRecord) -> Result<u64, StoreError> {
            self.inner.update(record).await
        }

        async fn delete_by_id(&self, id: Uuid) -> Result<u64, StoreError> {
            self.inner.delete_by_id(id).await
        }
    }

    #[tokio::test]
    async fn test_revoke_racing_a_delete_is_not_found() {
        let inner = MemoryStore::new();
        let settings = AuthSettings::new(b"revocation-secret", Duration::from_secs(3600)).unwrap();
        let issuer = TokenIssuer::new(Arc::new(inner.clone()), &settings);
        let issued = issuer.issue_record("ci-bot", None, None).await.unwrap();

        let shared: Arc<dyn CredentialStore> = Arc::new(DeletedMidway {
            inner: inner.clone(),
        });
        let validator = Arc::new(TokenValidator::new(shared.clone(), &settings));
        let revocation = RevocationManager::new(shared, validator, &settings);

        assert!(matches!(
            revocation.revoke_by_id(&issued.record.id.to_string()).await,
            Err(AuthError::NotFound)
        ));
        assert!(inner.is_empty().await);
    }
}
