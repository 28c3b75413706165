use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Credential;
use crate::database::models::user::normalize_email;
use crate::database::models::User;
use crate::database::{Repository, StoreError};
use crate::services::{present, MarketError, Validator};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

/// Partial profile change. Absent or blank fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    /// Current password, required to set `new_password`
    pub password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
}

impl UserService {
    pub fn new(users: Repository<User>) -> Self {
        Self { users }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, MarketError> {
        let mut v = Validator::new();
        let email = v.required("email", request.email.as_deref());
        let username = v.required("username", request.username.as_deref());
        // Passwords are taken verbatim, only emptiness is checked
        let password = request.password.as_deref().filter(|p| !p.is_empty());
        if password.is_none() {
            v.reject("password", "This field is required");
        }
        if let Some(email) = email {
            if let Err(problem) = validate_email(email) {
                v.reject("email", problem);
            }
        }
        if let Some(username) = username {
            if let Err(problem) = validate_username(username) {
                v.reject("username", problem);
            }
        }
        v.finish("Invalid registration")?;

        let (Some(email), Some(username), Some(password)) = (email, username, password) else {
            return Err(MarketError::Internal("validated registration lost a field".to_string()));
        };

        let now = Utc::now();
        let email = normalize_email(email);
        let user = User {
            id: Uuid::new_v4().to_string(),
            avatar: Some(default_avatar(&email)),
            email,
            username: username.to_string(),
            password: Credential::derive(password),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .users
            .transact(|users: &mut Vec<User>| {
                if users.iter().any(|u| u.has_email(&user.email)) {
                    return Err(MarketError::Conflict(
                        "A user with this email already exists".to_string(),
                    ));
                }
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        info!(user_id = %created.id, "User registered");
        Ok(created)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, MarketError> {
        let rejected = || MarketError::Unauthenticated("Invalid email or password".to_string());

        let user = match self.users.find_by(|u| u.has_email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                warn!("Login rejected");
                return Err(rejected());
            }
            Err(e) => return Err(e.into()),
        };

        if !user.password.verify(password) {
            warn!(user_id = %user.id, "Login rejected");
            return Err(rejected());
        }

        Ok(user)
    }

    pub async fn get(&self, id: &str) -> Result<User, MarketError> {
        match self.users.find_by_id(id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound { .. }) => Err(MarketError::NotFound(format!("User {} not found", id))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User, MarketError> {
        let email = present(update.email.as_deref()).map(str::to_string);
        let username = present(update.username.as_deref()).map(str::to_string);
        let avatar = present(update.avatar.as_deref()).map(str::to_string);
        let current_password = update.password.filter(|p| !p.is_empty());
        let new_password = update.new_password.filter(|p| !p.is_empty());

        let mut v = Validator::new();
        if let Some(email) = &email {
            if let Err(problem) = validate_email(email) {
                v.reject("email", problem);
            }
        }
        if let Some(username) = &username {
            if let Err(problem) = validate_username(username) {
                v.reject("username", problem);
            }
        }
        if new_password.is_some() && current_password.is_none() {
            v.reject("password", "Current password is required to set a new password");
        }
        v.finish("Invalid profile update")?;

        let updated = self
            .users
            .transact(|users: &mut Vec<User>| {
                if let Some(email) = &email {
                    if users.iter().any(|u| u.id != user_id && u.has_email(email)) {
                        return Err(MarketError::Conflict(
                            "A user with this email already exists".to_string(),
                        ));
                    }
                }

                let user = users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or_else(|| MarketError::NotFound(format!("User {} not found", user_id)))?;

                if let Some(current) = &current_password {
                    if !user.password.verify(current) {
                        return Err(MarketError::invalid_field("password", "Current password is incorrect"));
                    }
                }

                if let Some(email) = email {
                    user.email = normalize_email(&email);
                }
                if let Some(username) = username {
                    user.username = username;
                }
                if let Some(avatar) = avatar {
                    user.avatar = Some(avatar);
                }
                if let Some(new_password) = &new_password {
                    user.password = Credential::derive(new_password);
                }
                user.updated_at = Utc::now();
                Ok(user.clone())
            })
            .await?;

        info!(user_id = %user_id, "Profile updated");
        Ok(updated)
    }
}

pub fn default_avatar(email: &str) -> String {
    format!("https://i.pravatar.cc/150?u={}", email)
}

fn validate_email(email: &str) -> Result<(), String> {
    let invalid = || Err("Invalid email format".to_string());
    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return invalid();
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), String> {
    let length = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        return Err(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, hyphens, and underscores".to_string());
    }
    Ok(())
}
