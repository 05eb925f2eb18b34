use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved name of the privileged bootstrap credential.
pub const SYSTEM_TOKEN_NAME: &str = "system";

/// A persisted API token record.
///
/// The raw secret is never stored; only its digest. The signed claim token
/// handed to callers is the live bearer credential, while this row acts as
/// the server-side kill switch (`is_active`) and privilege marker (`is_system`).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub is_active: bool,
    pub is_system: bool,
    /// `None` means the token never expires. Required for system records.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// True when the record satisfies the system invariant
    /// (`is_system` set and no expiry).
    pub fn is_well_formed_system(&self) -> bool {
        self.is_system && self.expires_at.is_none()
    }
}

/// Input for creating a record. The store assigns `id` and timestamps.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: String,
    pub description: Option<String>,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Claims carried by the signed token.
///
/// `exp` is omitted for system tokens; its absence is what makes them
/// non-expiring on the validation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub token_id: String,
    pub name: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a successful issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A stored record together with a freshly minted claim token for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfoWithValue {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub token: String,
    pub is_active: bool,
    pub is_system: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenInfoWithValue {
    pub fn new(record: CredentialRecord, token: String) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            token,
            is_active: record.is_active,
            is_system: record.is_system,
            expires_at: record.expires_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
