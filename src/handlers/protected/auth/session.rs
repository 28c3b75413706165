use axum::{extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use crate::app::AppState;
use crate::handlers::public::auth::utils::set_cookie;
use crate::middleware::{ApiResponse, AuthUser};

/// POST /api/auth/logout - Revoke the presented session
///
/// The token stops validating immediately and the response clears the cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let cleared = state.gate.sign_out(&auth.token).await;
    info!(user_id = %auth.user.id, "User logged out");

    (set_cookie(&cleared), ApiResponse::success(json!({ "loggedOut": true })))
}
