use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Claims;
use crate::config::SessionConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret is not configured")]
    InvalidSecret,

    #[error("failed to sign session token: {0}")]
    TokenGeneration(String),

    #[error("malformed session token")]
    Malformed,

    #[error("session expired")]
    Expired,

    #[error("unknown or revoked session")]
    Unknown,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// Transport attributes for the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl SessionCookie {
    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, self.value, self.max_age_secs
        );
        if self.max_age_secs <= 0 {
            header.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub cookie: SessionCookie,
}

/// Issues, validates and revokes session tokens.
///
/// Tokens are signed and expiring, and each one is also registered in a
/// server-side table keyed by its `jti`. A token validates only while its row
/// exists, so revocation takes effect immediately and knowing a user id is
/// never enough to build a valid token.
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    cookie_name: String,
    secure_cookie: bool,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        // Ten years is far beyond any sensible session lifetime
        let hours = config.ttl_hours.min(24 * 365 * 10) as i64;
        Self::with_ttl(config, Duration::hours(hours))
    }

    pub fn with_ttl(config: &SessionConfig, ttl: Duration) -> Result<Self, SessionError> {
        if config.secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl,
            cookie_name: config.cookie_name.clone(),
            secure_cookie: config.secure_cookie,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub async fn issue(&self, user_id: &str) -> Result<IssuedSession, SessionError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;

        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|_, record| record.expires_at > now);
            sessions.insert(
                claims.jti.clone(),
                SessionRecord {
                    user_id: user_id.to_string(),
                    expires_at,
                },
            );
        }

        info!(user_id = %user_id, "Session issued");
        Ok(IssuedSession {
            cookie: SessionCookie {
                name: self.cookie_name.clone(),
                value: token.clone(),
                max_age_secs: self.ttl.num_seconds(),
                secure: self.secure_cookie,
            },
            token,
            user_id: user_id.to_string(),
            expires_at,
        })
    }

    /// Resolve a token to the user id it was issued for
    pub async fn validate(&self, token: &str) -> Result<String, SessionError> {
        let claims = self.decode(token, true)?;

        let sessions = self.sessions.read().await;
        let record = sessions.get(&claims.jti).ok_or(SessionError::Unknown)?;

        if record.expires_at <= Utc::now() {
            return Err(SessionError::Expired);
        }
        if record.user_id != claims.sub {
            return Err(SessionError::Unknown);
        }

        Ok(record.user_id.clone())
    }

    /// Invalidate a token and return the cookie that clears it client-side.
    /// Unknown or malformed tokens simply have nothing to revoke.
    pub async fn revoke(&self, token: &str) -> SessionCookie {
        if let Ok(claims) = self.decode(token, false) {
            if self.sessions.write().await.remove(&claims.jti).is_some() {
                info!(user_id = %claims.sub, "Session revoked");
            }
        } else {
            debug!("Revoke requested for an undecodable token");
        }
        self.clearing_cookie()
    }

    pub fn clearing_cookie(&self) -> SessionCookie {
        SessionCookie {
            name: self.cookie_name.clone(),
            value: String::new(),
            max_age_secs: 0,
            secure: self.secure_cookie,
        }
    }

    fn decode(&self, token: &str, check_expiry: bool) -> Result<Claims, SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.validate_exp = check_expiry;
        if !check_expiry {
            validation.required_spec_claims.remove("exp");
        }

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Malformed,
            })
    }
}
