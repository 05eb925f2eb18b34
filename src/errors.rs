use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Signature, expiry, binding and disabled failures all collapse here.
    /// The reason is for logs; the response body stays generic.
    #[error("invalid token: {0}")]
    InvalidToken(&'static str),

    #[error("system token required")]
    PrivilegeRequired,

    #[error("token not found")]
    NotFound,

    #[error("cannot delete system token")]
    ProtectedRecord,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Reason attached to an `InvalidToken`, if any.
    pub fn token_reason(&self) -> Option<&'static str> {
        match self {
            AuthError::InvalidToken(reason) => Some(reason),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AuthError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
                reason.clone(),
            ),
            AuthError::InvalidToken(reason) => {
                tracing::warn!(reason = %reason, "token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "authentication_error",
                    "invalid_token",
                    "invalid or missing token".to_string(),
                )
            }
            AuthError::PrivilegeRequired => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "system_token_required",
                "system token required".to_string(),
            ),
            AuthError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "token_not_found",
                "token not found".to_string(),
            ),
            AuthError::ProtectedRecord => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "protected_token",
                "cannot delete system token".to_string(),
            ),
            AuthError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AuthError::Signing(e) => {
                tracing::error!("Signing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
