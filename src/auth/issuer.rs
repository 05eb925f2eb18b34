use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use zeroize::Zeroizing;

use super::secret::{generate_secret, hash_secret};
use crate::config::AuthSettings;
use crate::errors::AuthError;
use crate::models::credential::{
    CredentialRecord, IssuedToken, NewCredential, TokenClaims, TokenInfoWithValue,
    SYSTEM_TOKEN_NAME,
};
use crate::store::{with_deadline, CredentialStore};

/// Everything produced by one issuance. `secret` only lives in memory and
/// is wiped on drop.
pub struct IssuedCredential {
    pub token: String,
    pub record: CredentialRecord,
    pub secret: Zeroizing<String>,
}

impl From<IssuedCredential> for IssuedToken {
    fn from(issued: IssuedCredential) -> Self {
        IssuedToken {
            token: issued.token,
            name: issued.record.name,
            expires_at: issued.record.expires_at,
            created_at: issued.record.created_at,
        }
    }
}

pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    default_validity: chrono::Duration,
    store_timeout: Duration,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn CredentialStore>, settings: &AuthSettings) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(&settings.signing_secret),
            default_validity: settings.default_validity,
            store_timeout: settings.store_timeout,
        }
    }

    /// Public issuance entry point. The reserved `system` name is refused
    /// here; privileged credentials only come from the bootstrapper.
    ///
    /// An explicit `expires_at` is used verbatim, even if it is already in
    /// the past.
    pub async fn issue(
        &self,
        name: &str,
        description: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IssuedToken, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidRequest("name is required".into()));
        }
        if name == SYSTEM_TOKEN_NAME {
            return Err(AuthError::InvalidRequest(format!(
                "token name '{}' is reserved",
                SYSTEM_TOKEN_NAME
            )));
        }

        let issued = self.issue_record(name, description, expires_at).await?;
        Ok(issued.into())
    }

    /// Create and persist a record, then mint a claim token for it.
    ///
    /// Never sets `is_system`; the bootstrapper promotes the record itself.
    pub async fn issue_record(
        &self,
        name: &str,
        description: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IssuedCredential, AuthError> {
        let secret = generate_secret();
        let issued_at = Utc::now();

        let expires_at = if name == SYSTEM_TOKEN_NAME {
            None
        } else {
            match expires_at {
                Some(at) => Some(at),
                None => Some(self.default_expiry(issued_at)?),
            }
        };

        let new = NewCredential {
            name: name.to_string(),
            description: description.filter(|d| !d.is_empty()),
            token_hash: hash_secret(&secret),
            expires_at,
        };
        let record = with_deadline(self.store_timeout, self.store.create(&new)).await?;
        let token = self.sign_at(&record, issued_at)?;

        tracing::info!(
            token_id = %record.id,
            name = %record.name,
            expires_at = ?record.expires_at,
            "issued API token"
        );

        Ok(IssuedCredential {
            token,
            record,
            secret,
        })
    }

    /// Mint a claim token for an existing record, issued now.
    pub fn sign(&self, record: &CredentialRecord) -> Result<String, AuthError> {
        self.sign_at(record, Utc::now())
    }

    fn default_expiry(&self, issued_at: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        issued_at
            .checked_add_signed(self.default_validity)
            .ok_or_else(|| AuthError::InvalidRequest("default token validity is out of range".into()))
    }

    fn sign_at(
        &self,
        record: &CredentialRecord,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let exp = match (record.is_system, record.expires_at) {
            (true, _) => None,
            (false, Some(at)) => Some(at.timestamp()),
            (false, None) => Some(self.default_expiry(issued_at)?.timestamp()),
        };
        let claims = TokenClaims {
            token_id: record.id.to_string(),
            name: record.name.clone(),
            iat: issued_at.timestamp(),
            exp,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Every record with a freshly minted claim token, newest first.
    pub async fn list_with_values(&self) -> Result<Vec<TokenInfoWithValue>, AuthError> {
        let records = with_deadline(self.store_timeout, self.store.list()).await?;
        Ok(self.attach_values(records))
    }

    /// Only the system records, with claim tokens. This is how operators
    /// retrieve the bootstrap credential.
    pub async fn system_tokens(&self) -> Result<Vec<TokenInfoWithValue>, AuthError> {
        let records = with_deadline(self.store_timeout, self.store.list()).await?;
        Ok(self.attach_values(records.into_iter().filter(|r| r.is_system).collect()))
    }

    fn attach_values(&self, records: Vec<CredentialRecord>) -> Vec<TokenInfoWithValue> {
        records
            .into_iter()
            .filter_map(|record| match self.sign(&record) {
                Ok(token) => Some(TokenInfoWithValue::new(record, token)),
                Err(e) => {
                    tracing::warn!(token_id = %record.id, "skipping token, signing failed: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const SECRET: &[u8] = b"unit-test-secret";

    fn issuer() -> (TokenIssuer, MemoryStore) {
        let store = MemoryStore::new();
        let settings = AuthSettings::new(SECRET, Duration::from_secs(3600)).unwrap();
        (TokenIssuer::new(Arc::new(store.clone()), &settings), store)
    }

    fn claims_of(token: &str) -> TokenClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        decode::<TokenClaims>(token, &DecodingKey::from_secret(SECRET), &validation)
            .unwrap()
            .claims
    }

    #[tokio::test]
    async fn test_issue_applies_default_validity() {
        let (issuer, store) = issuer();
        let issued = issuer.issue("ci-bot", None, None).await.unwrap();

        let claims = claims_of(&issued.token);
        assert_eq!(claims.name, "ci-bot");
        assert_eq!(claims.exp.unwrap() - claims.iat, 3600);

        let record = store.get_by_name("ci-bot").await.unwrap().unwrap();
        assert_eq!(claims.token_id, record.id.to_string());
        assert_eq!(issued.expires_at, record.expires_at);
        assert_eq!(record.expires_at.unwrap().timestamp(), claims.exp.unwrap());
    }

    #[tokio::test]
    async fn test_issue_uses_explicit_expiry_verbatim() {
        let (issuer, _) = issuer();
        let past = Utc::now() - chrono::Duration::hours(2);
        let issued = issuer.issue("stale", None, Some(past)).await.unwrap();
        assert_eq!(issued.expires_at, Some(past));
    }

    #[tokio::test]
    async fn test_issue_never_stores_raw_secret() {
        let (issuer, store) = issuer();
        let issued = issuer.issue_record("ci-bot", None, None).await.unwrap();
        let record = store.get_by_id(issued.record.id).await.unwrap().unwrap();
        assert_eq!(record.token_hash, hash_secret(&issued.secret));
        assert_ne!(record.token_hash, *issued.secret);
        assert!(!issued.token.contains(issued.secret.as_str()));
    }

    #[tokio::test]
    async fn test_public_issue_rejects_reserved_and_empty_names() {
        let (issuer, store) = issuer();
        assert!(matches!(
            issuer.issue("system", None, None).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            issuer.issue("   ", None, None).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_system_name_gets_no_expiry_and_no_flag() {
        let (issuer, _) = issuer();
        let issued = issuer.issue_record("system", None, None).await.unwrap();
        assert!(issued.record.expires_at.is_none());
        assert!(!issued.record.is_system);
    }

    #[tokio::test]
    async fn test_system_records_sign_without_exp() {
        let (issuer, store) = issuer();
        let mut record = issuer.issue_record("system", None, None).await.unwrap().record;
        record.is_system = true;
        store.update(&record).await.unwrap();

        let tokens = issuer.system_tokens().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(claims_of(&tokens[0].token).exp.is_none());
    }

    #[tokio::test]
    async fn test_list_with_values_covers_all_records() {
        let (issuer, _) = issuer();
        issuer.issue("a", None, None).await.unwrap();
        issuer.issue("b", Some("second".into()), None).await.unwrap();

        let listed = issuer.list_with_values().await.unwrap();
        assert_eq!(listed.len(), 2);
        for item in &listed {
            assert_eq!(claims_of(&item.token).token_id, item.id.to_string());
        }
        assert!(issuer.system_tokens().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_validity_is_rejected() {
        let store = MemoryStore::new();
        let mut settings = AuthSettings::new(SECRET, Duration::from_secs(3600)).unwrap();
        settings.default_validity = chrono::Duration::days(100_000_000);
        let issuer = TokenIssuer::new(Arc::new(store.clone()), &settings);

        assert!(matches!(
            issuer.issue("ci-bot", None, None).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(store.is_empty().await);

        // An explicit expiry does not touch the default window.
        let at = Utc::now() + chrono::Duration::hours(1);
        let issued = issuer.issue("ci-bot", None, Some(at)).await.unwrap();
        assert_eq!(issued.expires_at, Some(at));
    }
}
