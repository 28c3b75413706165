// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::database::models::UserView;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::RegisterRequest;

/**
 * POST /api/auth/register - Create a user account
 *
 * Expected Input:
 * ```json
 * { "email": "string", "password": "string", "username": "string" }
 * ```
 *
 * Answers 201 with the created user (never the credential). A duplicate
 * email, compared case-insensitively, answers 409.
 */
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserView> {
    let request = json_body(payload)?;
    let user = state.users.register(request).await?;
    Ok(ApiResponse::created(UserView::from(user)))
}
