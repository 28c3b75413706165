use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{IssuedSession, SessionCookie, SessionManager};
use crate::database::models::User;
use crate::database::{Repository, StoreError};
use crate::services::MarketError;

/// Resolves the caller behind a session token
#[derive(Clone)]
pub struct AuthGate {
    sessions: Arc<SessionManager>,
    users: Repository<User>,
}

impl AuthGate {
    pub fn new(sessions: Arc<SessionManager>, users: Repository<User>) -> Self {
        Self { sessions, users }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn sign_in(&self, user: &User) -> Result<IssuedSession, MarketError> {
        Ok(self.sessions.issue(&user.id).await?)
    }

    pub async fn sign_out(&self, token: &str) -> SessionCookie {
        self.sessions.revoke(token).await
    }

    /// Current user for `token`. A session whose user no longer exists is rejected.
    pub async fn current_user(&self, token: Option<&str>) -> Result<User, MarketError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MarketError::Unauthenticated("Authentication required".to_string()))?;

        let user_id = self.sessions.validate(token).await.map_err(|e| {
            debug!("Session rejected: {}", e);
            MarketError::from(e)
        })?;

        match self.users.find_by_id(&user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound { .. }) => {
                warn!(user_id = %user_id, "Session refers to a missing user");
                Err(MarketError::Unauthenticated("Invalid session".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{DocumentStore, MemoryBackend};

    fn gate() -> AuthGate {
        let store = Arc::new(DocumentStore::with_backend(Arc::new(MemoryBackend::new())));
        let sessions = SessionManager::new(&AppConfig::development().session).unwrap();
        AuthGate::new(Arc::new(sessions), Repository::new(store))
    }

    #[tokio::test]
    async fn token_resolves_to_user() {
        let gate = gate();
        let seeded = gate.users.find_by_id("1").await.unwrap();
        let session = gate.sign_in(&seeded).await.unwrap();

        let user = gate.current_user(Some(&session.token)).await.unwrap();
        assert_eq!(user.id, "1");
    }

    #[tokio::test]
    async fn missing_or_raw_id_tokens_are_rejected() {
        let gate = gate();
        assert!(matches!(gate.current_user(None).await, Err(MarketError::Unauthenticated(_))));
        assert!(matches!(gate.current_user(Some("")).await, Err(MarketError::Unauthenticated(_))));
        assert!(matches!(gate.current_user(Some("1")).await, Err(MarketError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn signed_out_token_is_rejected() {
        let gate = gate();
        let seeded = gate.users.find_by_id("1").await.unwrap();
        let session = gate.sign_in(&seeded).await.unwrap();
        gate.sign_out(&session.token).await;
        assert!(matches!(
            gate.current_user(Some(&session.token)).await,
            Err(MarketError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn session_for_deleted_user_is_rejected() {
        let gate = gate();
        let session = gate.sessions().issue("ghost").await.unwrap();
        assert!(matches!(
            gate.current_user(Some(&session.token)).await,
            Err(MarketError::Unauthenticated(_))
        ));
    }
}
