use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::database::models::UserView;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ProfileUpdate;

/// GET /api/profile - The authenticated user
pub async fn get(auth: AuthUser) -> ApiResult<UserView> {
    Ok(ApiResponse::success(UserView::from(auth.user)))
}

/// PUT /api/profile - Partial profile update
///
/// Accepts `email`, `username`, `avatar`, and `password` + `newPassword` for a
/// password change. Blank fields keep their stored value.
pub async fn put(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<UserView> {
    let update = json_body(payload)?;
    let user = state.users.update_profile(&auth.user.id, update).await?;
    Ok(ApiResponse::success(UserView::from(user)))
}
