use crate::infrastructure::json_file::strip_bom;
use crate::models::{AsteroidInput, StoreStats};
use crate::services::asteroid_store::{AsteroidStore, StoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Either `{"asteroids": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    Wrapped { asteroids: Vec<AsteroidInput> },
    Bare(Vec<AsteroidInput>),
}

#[derive(Debug)]
pub struct SeedReport {
    pub upserted: usize,
    pub stats: StoreStats,
}

pub fn parse_seed(raw: &[u8]) -> Result<Vec<AsteroidInput>, serde_json::Error> {
    let doc: SeedDocument = serde_json::from_slice(strip_bom(raw))?;
    Ok(match doc {
        SeedDocument::Wrapped { asteroids } => asteroids,
        SeedDocument::Bare(asteroids) => asteroids,
    })
}

pub async fn load_seed_file(path: &Path) -> Result<Vec<AsteroidInput>, SeedError> {
    let raw = tokio::fs::read(path).await.map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_seed(&raw).map_err(|source| SeedError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a seed document into the store and logs what landed.
pub async fn seed_store(store: &dyn AsteroidStore, path: &Path) -> Result<SeedReport, SeedError> {
    info!("🌱 Seeding asteroids from {}", path.display());

    let inputs = load_seed_file(path).await?;
    let saved = store.bulk_upsert(inputs).await?;
    let stats = store.stats().await?;

    info!(
        "📊 Store now holds {} asteroids ({} hazardous, average size {} m)",
        stats.total_asteroids, stats.hazardous_asteroids, stats.average_size
    );
    for asteroid in saved.iter().take(5) {
        info!(
            "   • #{} {} | {:.1} km/s | {:.1} Mkm | {} m | hazardous: {}",
            asteroid.id,
            asteroid.name,
            asteroid.velocity,
            asteroid.distance,
            asteroid.size,
            asteroid.hazardous()
        );
    }

    Ok(SeedReport {
        upserted: saved.len(),
        stats,
    })
}
