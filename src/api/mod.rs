use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::{require_system_token, require_token};
use crate::state::AppState;

pub mod handlers;

/// Build the controller's HTTP router.
///
/// - public: health check and token issuance
/// - any valid token: self-revocation
/// - system token only: listing with values, revoke by id, hard delete
pub fn api_router(state: Arc<AppState>) -> Router {
    let system_only = Router::new()
        .route("/auth/tokens/detailed", get(handlers::list_tokens_detailed))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/tokens/:id", delete(handlers::delete_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_system_token,
        ));

    let authenticated = Router::new()
        .route("/auth/token/revoke", post(handlers::revoke_current_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/token", post(handlers::create_token))
        .merge(system_only)
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
