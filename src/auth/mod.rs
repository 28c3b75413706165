pub mod credential;
pub mod session;

use serde::{Deserialize, Serialize};

pub use credential::Credential;
pub use session::{IssuedSession, SessionCookie, SessionError, SessionManager};

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id the session belongs to
    pub sub: String,
    /// Session id, the key of the server-side session row
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}
