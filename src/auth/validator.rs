use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::errors::AuthError;
use crate::models::credential::{CredentialRecord, TokenClaims};
use crate::store::{with_deadline, CredentialStore};

/// Read-only validation path. Holds no mutable state, so one instance can
/// serve any number of concurrent requests.
pub struct TokenValidator {
    store: Arc<dyn CredentialStore>,
    decoding_key: DecodingKey,
    validation: Validation,
    store_timeout: Duration,
}

impl TokenValidator {
    pub fn new(store: Arc<dyn CredentialStore>, settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // System tokens carry no `exp`; when present it is enforced exactly.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            store,
            decoding_key: DecodingKey::from_secret(&settings.signing_secret),
            validation,
            store_timeout: settings.store_timeout,
        }
    }

    /// Verify signature and expiry, without touching the store.
    pub fn decode_claims(&self, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::InvalidToken("token expired"),
                ErrorKind::InvalidSignature => AuthError::InvalidToken("signature mismatch"),
                _ => AuthError::InvalidToken("invalid token"),
            })
    }

    /// Resolve a presented claim token to its active record.
    pub async fn validate(&self, token: &str) -> Result<CredentialRecord, AuthError> {
        let claims = self.decode_claims(token)?;
        let id = Uuid::parse_str(&claims.token_id)
            .map_err(|_| AuthError::InvalidToken("invalid token ID in token"))?;

        let record = with_deadline(self.store_timeout, self.store.get_by_id(id))
            .await?
            .ok_or(AuthError::InvalidToken("token not found"))?;

        if !record.is_active {
            return Err(AuthError::InvalidToken("token is disabled"));
        }

        Ok(record)
    }

    /// Like [`validate`](Self::validate), but also requires the system flag.
    pub async fn validate_system(&self, token: &str) -> Result<CredentialRecord, AuthError> {
        let record = self.validate(token).await?;
        if !record.is_system {
            tracing::warn!(token_id = %record.id, "system token required");
            return Err(AuthError::PrivilegeRequired);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issuer::TokenIssuer;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"validator-secret";

    fn setup() -> (TokenIssuer, TokenValidator, MemoryStore) {
        let store = MemoryStore::new();
        let settings = AuthSettings::new(SECRET, Duration::from_secs(3600)).unwrap();
        let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());
        (
            TokenIssuer::new(shared.clone(), &settings),
            TokenValidator::new(shared, &settings),
            store,
        )
    }

    fn forge(claims: &TokenClaims, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip_returns_record() {
        let (issuer, validator, _) = setup();
        let issued = issuer.issue("ci-bot", None, None).await.unwrap();
        let record = validator.validate(&issued.token).await.unwrap();
        assert_eq!(record.name, "ci-bot");
        assert!(record.is_active);
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let (issuer, validator, _) = setup();
        let issued = issuer.issue("ci-bot", None, None).await.unwrap();
        let claims = validator.decode_claims(&issued.token).unwrap();
        let forged = forge(&claims, b"other-secret");
        assert_eq!(
            validator.validate(&forged).await.unwrap_err().token_reason(),
            Some("signature mismatch")
        );
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let (_, validator, _) = setup();
        for junk in ["", "abc", "a.b.c"] {
            assert!(matches!(
                validator.validate(junk).await,
                Err(AuthError::InvalidToken(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_binding() {
        let (_, validator, _) = setup();
        let now = Utc::now().timestamp();
        let unknown = forge(
            &TokenClaims {
                token_id: Uuid::new_v4().to_string(),
                name: "ghost".into(),
                iat: now,
                exp: Some(now + 60),
            },
            SECRET,
        );
        assert_eq!(
            validator.validate(&unknown).await.unwrap_err().token_reason(),
            Some("token not found")
        );

        let malformed = forge(
            &TokenClaims {
                token_id: "not-a-uuid".into(),
                name: "ghost".into(),
                iat: now,
                exp: Some(now + 60),
            },
            SECRET,
        );
        assert_eq!(
            validator.validate(&malformed).await.unwrap_err().token_reason(),
            Some("invalid token ID in token")
        );
    }

    #[tokio::test]
    async fn test_disabled_record_is_rejected() {
        let (issuer, validator, store) = setup();
        let issued = issuer.issue_record("ci-bot", None, None).await.unwrap();
        let mut record = issued.record;
        record.is_active = false;
        store.update(&record).await.unwrap();

        assert_eq!(
            validator.validate(&issued.token).await.unwrap_err().token_reason(),
            Some("token is disabled")
        );
    }

    #[tokio::test]
    async fn test_validate_system_requires_flag() {
        let (issuer, validator, _) = setup();
        let issued = issuer.issue("ci-bot", None, None).await.unwrap();
        assert!(matches!(
            validator.validate_system(&issued.token).await,
            Err(AuthError::PrivilegeRequired)
        ));
    }
}
