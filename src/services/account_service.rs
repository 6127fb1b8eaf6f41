use crate::models::{LooseValue, PublicUser, User, WatchedAsteroid};
use crate::services::user_store::{UserStore, UserStoreError};
use crate::utils::auth::{Claims, create_jwt, validate_jwt};
use crate::utils::clock::Clock;
use crate::utils::hash::hash_password;
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const MAX_USERNAME_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Asteroid is already in the watchlist")]
    AlreadyWatched,

    #[error(transparent)]
    Store(UserStoreError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl From<UserStoreError> for AccountError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateUsername | UserStoreError::DuplicateEmail => {
                AccountError::Duplicate(err.to_string())
            }
            UserStoreError::NotFound => AccountError::UserNotFound,
            other => AccountError::Store(other),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Signup, login, bearer-token checks and per-user profile/watchlist edits.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    secret: String,
    token_ttl: Duration,
    default_avatar_url: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        secret: String,
        token_ttl: Duration,
        default_avatar_url: String,
    ) -> Self {
        Self {
            users,
            clock,
            secret,
            token_ttl,
            default_avatar_url,
        }
    }

    pub async fn signup(&self, form: SignupForm) -> Result<AuthSession, AccountError> {
        let (Some(username), Some(email), Some(_), Some(_)) = (
            required(&form.username),
            required(&form.email),
            required(&form.password),
            required(&form.confirm_password),
        ) else {
            return Err(AccountError::Validation("All fields are required".to_string()));
        };

        if form.password != form.confirm_password {
            return Err(AccountError::Validation("Passwords do not match".to_string()));
        }

        form.validate()
            .map_err(|e| AccountError::Validation(e.to_string()))?;

        let password = form.password.as_deref().unwrap_or_default();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.chars().take(MAX_USERNAME_CHARS).collect(),
            email: email.to_string(),
            password: hash_password(password, &self.secret),
            created_at: self.clock.now(),
            avatar_url: Some(self.default_avatar_url.clone()),
            watched_asteroids: Vec::new(),
            alerts: Vec::new(),
        };

        let user = self.users.create(user).await?;
        info!("👤 Registered user {} ({})", user.username, user.id);
        self.session_for(user)
    }

    pub async fn login(&self, form: LoginForm) -> Result<AuthSession, AccountError> {
        let (Some(username), Some(password)) = (required(&form.username), form.password.as_deref())
        else {
            return Err(AccountError::Validation(
                "Username and password are required".to_string(),
            ));
        };

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if hash_password(password, &self.secret) != user.password {
            return Err(AccountError::InvalidCredentials);
        }

        info!("🔑 User {} logged in", user.id);
        self.session_for(user)
    }

    /// Resolves an `Authorization` header value to the token's claims.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Claims, AccountError> {
        let header = header
            .ok_or_else(|| AccountError::Unauthorized("Missing authorization token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AccountError::Unauthorized("Malformed authorization header".to_string())
            })?;

        validate_jwt(token, &self.secret, self.clock.now()).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AccountError::Unauthorized("Token expired".to_string()),
            _ => AccountError::Unauthorized("Invalid token".to_string()),
        })
    }

    pub async fn profile(&self, user_id: &str) -> Result<PublicUser, AccountError> {
        Ok(self.load(user_id).await?.into())
    }

    /// Applies only the supplied fields. Email cannot change here.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<PublicUser, AccountError> {
        let mut user = self.load(user_id).await?;

        if let Some(username) = update.username.as_deref().map(str::trim)
            && !username.is_empty()
        {
            user.username = username.chars().take(MAX_USERNAME_CHARS).collect();
        }
        if let Some(avatar_url) = update.avatar_url {
            user.avatar_url = Some(avatar_url);
        }

        Ok(self.users.update(user).await?.into())
    }

    pub async fn watchlist(&self, user_id: &str) -> Result<Vec<WatchedAsteroid>, AccountError> {
        Ok(self.load(user_id).await?.watched_asteroids)
    }

    pub async fn add_watch(
        &self,
        user_id: &str,
        asteroid_id: &str,
        asteroid_name: &str,
    ) -> Result<Vec<WatchedAsteroid>, AccountError> {
        let asteroid_id = LooseValue::from(asteroid_id).to_key();
        if asteroid_id.is_empty() || asteroid_name.trim().is_empty() {
            return Err(AccountError::Validation(
                "asteroidId and asteroidName are required".to_string(),
            ));
        }

        let mut user = self.load(user_id).await?;
        if user.watched_asteroids.iter().any(|w| w.id == asteroid_id) {
            return Err(AccountError::AlreadyWatched);
        }

        user.watched_asteroids.push(WatchedAsteroid {
            id: asteroid_id,
            name: asteroid_name.trim().to_string(),
            added_at: self.clock.now(),
        });

        Ok(self.users.update(user).await?.watched_asteroids)
    }

    /// Removing an id that is not watched succeeds and changes nothing.
    pub async fn remove_watch(
        &self,
        user_id: &str,
        asteroid_id: &str,
    ) -> Result<Vec<WatchedAsteroid>, AccountError> {
        let asteroid_id = LooseValue::from(asteroid_id).to_key();
        let mut user = self.load(user_id).await?;
        let before = user.watched_asteroids.len();
        user.watched_asteroids.retain(|w| w.id != asteroid_id);

        if user.watched_asteroids.len() == before {
            return Ok(user.watched_asteroids);
        }
        Ok(self.users.update(user).await?.watched_asteroids)
    }

    async fn load(&self, user_id: &str) -> Result<User, AccountError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, AccountError> {
        let token = create_jwt(&user.id, &self.secret, self.clock.now(), self.token_ttl)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }
}
