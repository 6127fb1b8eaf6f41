use crate::config::AppConfig;
use crate::services::asteroid_store::{AsteroidStore, JsonFileAsteroidStore};
use crate::services::user_store::{JsonFileUserStore, UserStore};
use crate::utils::clock::Clock;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// The file-backed stores shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub asteroids: Arc<dyn AsteroidStore>,
    pub users: Arc<dyn UserStore>,
}

pub async fn setup_database(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Stores> {
    info!("📂 Data directory: {}", config.data_dir.display());

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    let asteroids =
        JsonFileAsteroidStore::new(config.asteroids_file(), config.cache_file(), clock);
    asteroids.init().await?;

    let users = JsonFileUserStore::new(config.users_file());
    users.init().await?;

    let removed = asteroids.sweep_expired().await?;
    if removed > 0 {
        info!("🧹 Removed {} expired cache entries on startup", removed);
    }

    info!("✅ Stores ready");

    Ok(Stores {
        asteroids: Arc::new(asteroids),
        users: Arc::new(users),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::SystemClock;

    #[tokio::test]
    async fn test_setup_creates_backing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };

        let stores = setup_database(&config, Arc::new(SystemClock)).await.unwrap();

        assert!(config.asteroids_file().exists());
        assert!(config.cache_file().exists());
        assert!(config.users_file().exists());
        assert!(stores.asteroids.get_all().await.unwrap().is_empty());
        assert!(stores.users.get("nobody").await.unwrap().is_none());
    }
}
