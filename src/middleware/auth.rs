//! `Authorization: Token <claimToken>` guards for the HTTP surface.
//!
//! Header problems (missing, wrong scheme, empty value) are rejected here
//! with the same generic 401 the validator produces, so callers cannot tell
//! which check failed.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::errors::AuthError;
use crate::state::AppState;

pub const TOKEN_SCHEME: &str = "Token ";

/// Pull the claim token out of the `Authorization` header.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::InvalidToken("authorization header is required"))?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not valid text"))?;

    let token = value
        .strip_prefix(TOKEN_SCHEME)
        .ok_or(AuthError::InvalidToken("expected 'Token <token>'"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidToken("token is required"));
    }
    Ok(token)
}

/// Middleware: any active token. The resolved `CredentialRecord` is stored
/// in request extensions for handlers.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Owned copy: the request body is not `Sync`, so no borrow of `req` may
    // be held across the await.
    let token = extract_token(req.headers())?.to_owned();
    let record = state.validator.validate(&token).await?;
    req.extensions_mut().insert(record);
    Ok(next.run(req).await)
}

/// Middleware: active token whose record carries the system flag.
pub async fn require_system_token(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(req.headers())?.to_owned();
    let record = state.validator.validate_system(&token).await?;
    req.extensions_mut().insert(record);
    Ok(next.run(req).await)
}
