//! Item lookup controller.

use crate::{
    catalog::Item,
    responses::{ok, ApiResult},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

/// Create the items router.
pub fn router() -> Router<AppState> {
    Router::new().route("/:id", get(get_item))
}

/// Returns one item. Repeated requests within the expiry window are
/// answered from the cache without touching the catalog.
pub async fn get_item(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Item> {
    let item = state.items.try_call(id).await?;
    ok(item)
}
