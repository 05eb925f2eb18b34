use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AuthError;
use crate::middleware::auth::extract_token;
use crate::models::credential::{IssuedToken, TokenInfoWithValue, TokenRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RevokeParams {
    pub token_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /auth/token: issue a new API token
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuedToken>), AuthError> {
    let Json(payload) = payload.map_err(|e| AuthError::InvalidRequest(e.body_text()))?;
    let issued = state
        .issuer
        .issue(&payload.name, payload.description, payload.expires_at)
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// POST /auth/token/revoke: revoke the token used to make this request
pub async fn revoke_current_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthError> {
    let token = extract_token(&headers)?;
    state.revocation.revoke_by_presented_token(token).await?;
    Ok(Json(json!({ "message": "Token revoked successfully" })))
}

/// GET /auth/tokens/detailed: every token with a claim value (system only)
pub async fn list_tokens_detailed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TokenInfoWithValue>>, AuthError> {
    Ok(Json(state.issuer.list_with_values().await?))
}

/// POST /auth/revoke?token_id=<uuid>: disable a token by id (system only)
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RevokeParams>,
) -> Result<Json<Value>, AuthError> {
    let token_id = params
        .token_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AuthError::InvalidRequest("token_id parameter is required".into()))?;

    state.revocation.revoke_by_id(&token_id).await?;
    Ok(Json(json!({ "message": "Token revoked successfully" })))
}

/// DELETE /auth/tokens/:id: permanently delete a token (system only)
pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AuthError> {
    state.revocation.hard_delete(&id).await?;
    Ok(Json(json!({ "message": "Token deleted successfully" })))
}
