// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::rejection::JsonRejection, extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use super::utils::{set_cookie, SessionBody};
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::ApiResponse;
use crate::services::{MarketError, Validator};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/**
 * POST /api/auth/login - Exchange email and password for a session
 *
 * Expected Input:
 * ```json
 * { "email": "test@example.com", "password": "password123" }
 * ```
 *
 * Sets the session cookie and also returns the token, its expiry and the
 * user (without credential) in the success envelope. Unknown email and
 * wrong password both answer 401 with the same message.
 */
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;

    let mut v = Validator::new();
    let email = v.required("email", request.email.as_deref());
    let password = request.password.as_deref().filter(|p| !p.is_empty());
    if password.is_none() {
        v.reject("password", "This field is required");
    }
    v.finish("Email and password are required")?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(MarketError::Internal("validated login lost a field".to_string()).into());
    };

    let user = state.users.login(email, password).await?;
    let session = state.gate.sign_in(&user).await?;

    Ok((
        set_cookie(&session.cookie),
        ApiResponse::success(SessionBody::new(&session, &user)),
    ))
}
