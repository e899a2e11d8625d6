//! Cache inspection and invalidation controller.

use crate::{
    responses::{ok, ApiResult},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Router,
};
use cachet::KeyArgs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Create the cache admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/keys", get(list_keys))
        .route("/:prefix", delete(invalidate_prefix))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for key listing.
#[derive(Debug, Deserialize)]
pub struct KeysParams {
    /// Key fragment, resolved under the cache namespace.
    pub pattern: String,
}

/// Key listing response.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

/// Invalidation response.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub prefix: String,
    pub removed: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Lists cached keys containing the namespaced pattern.
pub async fn list_keys(
    State(state): State<AppState>,
    Query(params): Query<KeysParams>,
) -> ApiResult<KeysResponse> {
    let keys = state.cache.keys(KeyArgs::new(params.pattern)).await?;
    ok(KeysResponse {
        count: keys.len(),
        keys,
    })
}

/// Drops every cached entry under `prefix`.
pub async fn invalidate_prefix(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> ApiResult<InvalidateResponse> {
    let removed = state.cache.delete_startswith(KeyArgs::new(prefix.as_str())).await?;
    info!(prefix = %prefix, removed, "Cache invalidated via API");
    ok(InvalidateResponse { prefix, removed })
}
