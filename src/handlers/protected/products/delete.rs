use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// DELETE /api/products/:id - Remove one of the caller's own listings
///
/// 404 when the id is unknown, 403 when the caller is not the owner. Stored
/// images of the removed listing are deleted as well.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let removed = state.products.delete(&auth.user.id, &id).await?;
    state.images.remove_all(&removed.images).await;
    Ok(ApiResponse::success(json!({ "id": removed.id, "deleted": true })))
}
