//! Token authentication: issuance, validation, revocation and the
//! system credential bootstrap.
//!
//! A credential has two layers: an opaque random secret whose SHA-256 digest
//! is stored in `api_tokens`, and an HS256-signed claim token bound to the
//! row id. The claim token is what callers present (`Token <jwt>`); the row
//! is consulted on every validation so that revocation takes effect
//! immediately.

pub mod bootstrap;
pub mod issuer;
pub mod revocation;
pub mod secret;
pub mod validator;

pub use bootstrap::{BootstrapOutcome, SystemCredentialBootstrapper};
pub use issuer::{IssuedCredential, TokenIssuer};
pub use revocation::RevocationManager;
pub use validator::TokenValidator;

use uuid::Uuid;

use crate::errors::AuthError;

/// Parse a caller-supplied record identifier.
pub fn parse_token_id(raw: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AuthError::InvalidRequest("invalid token ID format".into()))
}
