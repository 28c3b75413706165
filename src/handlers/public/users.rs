use axum::extract::{Path, State};

use crate::app::AppState;
use crate::database::models::UserView;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/users/:id - Public user profile
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserView> {
    let user = state.users.get(&id).await?;
    Ok(ApiResponse::success(UserView::from(user)))
}
