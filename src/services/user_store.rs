use crate::infrastructure::json_file::{ensure_json_file, read_json_map, write_json_pretty};
use crate::models::User;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

pub type UserMap = BTreeMap<String, User>;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    #[error("User storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage port for account records. Usernames and emails are unique
/// across all records; `create` and `update` enforce it.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>, UserStoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError>;
    async fn create(&self, user: User) -> Result<User, UserStoreError>;
    /// Replaces the stored record with the same id.
    async fn update(&self, user: User) -> Result<User, UserStoreError>;
}

fn check_unique(users: &UserMap, candidate: &User) -> Result<(), UserStoreError> {
    for other in users.values().filter(|u| u.id != candidate.id) {
        if other.username == candidate.username {
            return Err(UserStoreError::DuplicateUsername);
        }
        if other.email == candidate.email {
            return Err(UserStoreError::DuplicateEmail);
        }
    }
    Ok(())
}

pub fn insert_user(users: &mut UserMap, user: User) -> Result<User, UserStoreError> {
    check_unique(users, &user)?;
    users.insert(user.id.clone(), user.clone());
    Ok(user)
}

pub fn replace_user(users: &mut UserMap, user: User) -> Result<User, UserStoreError> {
    if !users.contains_key(&user.id) {
        return Err(UserStoreError::NotFound);
    }
    check_unique(users, &user)?;
    users.insert(user.id.clone(), user.clone());
    Ok(user)
}

/// users.json: a pretty-printed object keyed by user id.
pub struct JsonFileUserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileUserStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub async fn init(&self) -> Result<(), UserStoreError> {
        ensure_json_file(&self.path, &UserMap::new()).await?;
        Ok(())
    }

    async fn load(&self) -> UserMap {
        read_json_map(&self.path).await
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self.load().await.remove(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .load()
            .await
            .into_values()
            .find(|u| u.username == username))
    }

    async fn create(&self, user: User) -> Result<User, UserStoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.load().await;
        let created = insert_user(&mut users, user)?;
        write_json_pretty(&self.path, &users).await?;
        Ok(created)
    }

    async fn update(&self, user: User) -> Result<User, UserStoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.load().await;
        let updated = replace_user(&mut users, user)?;
        write_json_pretty(&self.path, &users).await?;
        Ok(updated)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<UserMap>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, UserStoreError> {
        insert_user(&mut *self.users.lock().await, user)
    }

    async fn update(&self, user: User) -> Result<User, UserStoreError> {
        replace_user(&mut *self.users.lock().await, user)
    }
}
