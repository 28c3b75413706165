use axum::http::{header, HeaderName};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{IssuedSession, SessionCookie};
use crate::database::models::{User, UserView};

/// Body returned when a session is issued
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

impl SessionBody {
    pub fn new(session: &IssuedSession, user: &User) -> Self {
        Self {
            token: session.token.clone(),
            expires_at: session.expires_at,
            user: UserView::from(user),
        }
    }
}

/// `Set-Cookie` header pair for a session cookie
pub fn set_cookie(cookie: &SessionCookie) -> [(HeaderName, String); 1] {
    [(header::SET_COOKIE, cookie.to_header_value())]
}
