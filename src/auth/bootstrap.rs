use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::issuer::TokenIssuer;
use super::secret::hash_secret;
use crate::config::AuthSettings;
use crate::errors::AuthError;
use crate::models::credential::{CredentialRecord, SYSTEM_TOKEN_NAME};
use crate::store::{with_deadline, CredentialStore, StoreError};

const SYSTEM_TOKEN_DESCRIPTION: &str = "Default system token for internal operations";

/// What a bootstrap run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created(Uuid),
    Repaired(Uuid),
    Unchanged(Uuid),
}

impl BootstrapOutcome {
    pub fn id(&self) -> Uuid {
        match *self {
            BootstrapOutcome::Created(id)
            | BootstrapOutcome::Repaired(id)
            | BootstrapOutcome::Unchanged(id) => id,
        }
    }
}

/// Converges the store to exactly one well-formed `system` record.
///
/// Safe to run on every start-up. It only ever creates or upgrades the
/// record; it never revokes or deletes it.
pub struct SystemCredentialBootstrapper {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    store_timeout: Duration,
}

impl SystemCredentialBootstrapper {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            store,
            issuer,
            store_timeout: settings.store_timeout,
        }
    }

    pub async fn ensure_system_credential(&self) -> Result<BootstrapOutcome, AuthError> {
        if let Some(existing) = self.find_system().await? {
            return self.repair(existing).await;
        }

        let issued = match self
            .issuer
            .issue_record(SYSTEM_TOKEN_NAME, Some(SYSTEM_TOKEN_DESCRIPTION.into()), None)
            .await
        {
            Ok(issued) => issued,
            // Another instance created it between our read and our insert.
            Err(AuthError::Storage(StoreError::Conflict(reason))) => {
                tracing::info!(%reason, "system token created concurrently, repairing instead");
                let existing = self.find_system().await?.ok_or(AuthError::NotFound)?;
                return self.repair(existing).await;
            }
            Err(e) => return Err(e),
        };

        let hash = hash_secret(&issued.secret);
        let mut record = with_deadline(self.store_timeout, self.store.get_by_secret_hash(&hash))
            .await?
            .ok_or(AuthError::NotFound)?;

        record.is_system = true;
        record.expires_at = None;
        if with_deadline(self.store_timeout, self.store.update(&record)).await? == 0 {
            return Err(AuthError::NotFound);
        }

        tracing::info!(token_id = %record.id, "created system token");
        Ok(BootstrapOutcome::Created(record.id))
    }

    async fn find_system(&self) -> Result<Option<CredentialRecord>, AuthError> {
        Ok(with_deadline(self.store_timeout, self.store.get_by_name(SYSTEM_TOKEN_NAME)).await?)
    }

    /// Writes only when the record drifted from the invariant.
    async fn repair(&self, mut record: CredentialRecord) -> Result<BootstrapOutcome, AuthError> {
        if record.is_well_formed_system() {
            tracing::debug!(token_id = %record.id, "system token already in place");
            return Ok(BootstrapOutcome::Unchanged(record.id));
        }

        record.is_system = true;
        record.expires_at = None;
        if with_deadline(self.store_timeout, self.store.update(&record)).await? == 0 {
            return Err(AuthError::NotFound);
        }
        tracing::info!(token_id = %record.id, "repaired system token");
        Ok(BootstrapOutcome::Repaired(record.id))
    }
}
