use crate::infrastructure::json_file::{
    ensure_json_file, read_json_list, read_json_or_default, write_json_pretty,
};
use crate::models::{Asteroid, AsteroidInput, CacheEntry, StoreStats};
use crate::utils::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type CacheMap = BTreeMap<String, CacheEntry>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage port for asteroid records and the time-boxed response cache.
#[async_trait]
pub trait AsteroidStore: Send + Sync {
    /// All records, nearest first.
    async fn get_all(&self) -> Result<Vec<Asteroid>, StoreError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Asteroid>, StoreError>;
    async fn get_hazardous(&self) -> Result<Vec<Asteroid>, StoreError>;
    /// Records with `min <= size <= max`, largest first.
    async fn get_by_size(&self, min: i64, max: i64) -> Result<Vec<Asteroid>, StoreError>;
    async fn upsert(&self, input: AsteroidInput) -> Result<Asteroid, StoreError>;

    /// Upserts in input order. Not atomic: a failure part-way leaves the
    /// earlier records written.
    async fn bulk_upsert(&self, inputs: Vec<AsteroidInput>) -> Result<Vec<Asteroid>, StoreError> {
        let total = inputs.len();
        let mut stored = Vec::with_capacity(total);
        for input in inputs {
            stored.push(self.upsert(input).await?);
        }
        info!("✅ Inserted/updated {} asteroids", total);
        Ok(stored)
    }

    async fn set_cache(
        &self,
        key: &str,
        data: serde_json::Value,
        ttl_minutes: i64,
    ) -> Result<(), StoreError>;
    /// Live payload for `key`; an expired entry is purged and reported absent.
    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    /// Removes every expired entry, returning how many went.
    async fn sweep_expired(&self) -> Result<usize, StoreError>;
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

fn by_distance(a: &Asteroid, b: &Asteroid) -> Ordering {
    a.distance.total_cmp(&b.distance)
}

pub fn sorted_by_distance(mut records: Vec<Asteroid>) -> Vec<Asteroid> {
    records.sort_by(by_distance);
    records
}

pub fn hazardous_only(records: Vec<Asteroid>) -> Vec<Asteroid> {
    sorted_by_distance(records.into_iter().filter(Asteroid::hazardous).collect())
}

pub fn within_size(records: Vec<Asteroid>, min: i64, max: i64) -> Vec<Asteroid> {
    let mut matching: Vec<Asteroid> = records
        .into_iter()
        .filter(|a| a.size >= min && a.size <= max)
        .collect();
    matching.sort_by(|a, b| b.size.cmp(&a.size));
    matching
}

/// Merges `input` into `records` by name, or appends it with the next id.
/// Returns the stored record.
pub fn apply_upsert(records: &mut Vec<Asteroid>, input: AsteroidInput, now: DateTime<Utc>) -> Asteroid {
    let velocity = input.velocity.as_f64();
    let distance = input.distance.as_f64();
    let size = input.size.as_f64().round() as i64;
    let is_hazardous = u8::from(input.is_hazardous.is_truthy());
    let approach_date = input
        .approach_date
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| now.to_rfc3339());

    if let Some(existing) = records.iter_mut().find(|a| a.name == input.name) {
        existing.velocity = velocity;
        existing.distance = distance;
        existing.size = size;
        existing.is_hazardous = is_hazardous;
        existing.approach_date = approach_date;
        existing.updated_at = now;
        return existing.clone();
    }

    let id = records.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    let record = Asteroid {
        id,
        name: input.name,
        velocity,
        distance,
        size,
        is_hazardous,
        approach_date,
        created_at: now,
        updated_at: now,
    };
    records.push(record.clone());
    record
}

pub fn new_cache_entry(data: serde_json::Value, now: DateTime<Utc>, ttl_minutes: i64) -> CacheEntry {
    CacheEntry {
        data,
        created_at: now,
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

/// Looks `key` up, dropping it from `cache` when expired. The flag reports
/// whether the map changed.
pub fn take_live_entry(
    cache: &mut CacheMap,
    key: &str,
    now: DateTime<Utc>,
) -> (Option<serde_json::Value>, bool) {
    let expired = match cache.get(key) {
        None => return (None, false),
        Some(entry) => entry.is_expired(now),
    };
    if expired {
        cache.remove(key);
        return (None, true);
    }
    (cache.get(key).map(|entry| entry.data.clone()), false)
}

pub fn remove_expired(cache: &mut CacheMap, now: DateTime<Utc>) -> usize {
    let before = cache.len();
    cache.retain(|_, entry| !entry.is_expired(now));
    before - cache.len()
}

pub fn summarize(records: &[Asteroid], db_path: String, db_size: u64) -> StoreStats {
    let total = records.len();
    let hazardous = records.iter().filter(|a| a.hazardous()).count();
    let size_sum: i128 = records.iter().map(|a| i128::from(a.size)).sum();
    let average_size = if total == 0 {
        0
    } else {
        (size_sum as f64 / total as f64).round() as i64
    };

    StoreStats {
        total_asteroids: total,
        hazardous_asteroids: hazardous,
        average_size,
        db_path,
        db_size,
    }
}

/// Asteroids and cache persisted as two pretty-printed JSON files.
/// Each mutation rewrites the whole file while holding that file's lock.
pub struct JsonFileAsteroidStore {
    asteroids_path: PathBuf,
    cache_path: PathBuf,
    clock: Arc<dyn Clock>,
    asteroids_lock: Mutex<()>,
    cache_lock: Mutex<()>,
}

impl JsonFileAsteroidStore {
    pub fn new(asteroids_path: PathBuf, cache_path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self {
            asteroids_path,
            cache_path,
            clock,
            asteroids_lock: Mutex::new(()),
            cache_lock: Mutex::new(()),
        }
    }

    /// Creates empty backing files when they are missing.
    pub async fn init(&self) -> Result<(), StoreError> {
        ensure_json_file(&self.asteroids_path, &Vec::<Asteroid>::new()).await?;
        ensure_json_file(&self.cache_path, &CacheMap::new()).await?;
        info!(
            "✅ JSON-file store initialized ({})",
            self.asteroids_path.display()
        );
        Ok(())
    }

    async fn load(&self) -> Vec<Asteroid> {
        read_json_list(&self.asteroids_path).await
    }

    async fn load_cache(&self) -> CacheMap {
        read_json_or_default(&self.cache_path).await
    }
}

#[async_trait]
impl AsteroidStore for JsonFileAsteroidStore {
    async fn get_all(&self) -> Result<Vec<Asteroid>, StoreError> {
        Ok(sorted_by_distance(self.load().await))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Asteroid>, StoreError> {
        Ok(self.load().await.into_iter().find(|a| a.name == name))
    }

    async fn get_hazardous(&self) -> Result<Vec<Asteroid>, StoreError> {
        Ok(hazardous_only(self.load().await))
    }

    async fn get_by_size(&self, min: i64, max: i64) -> Result<Vec<Asteroid>, StoreError> {
        Ok(within_size(self.load().await, min, max))
    }

    async fn upsert(&self, input: AsteroidInput) -> Result<Asteroid, StoreError> {
        let _guard = self.asteroids_lock.lock().await;
        let mut records = self.load().await;
        let stored = apply_upsert(&mut records, input, self.clock.now());
        write_json_pretty(&self.asteroids_path, &records).await?;
        debug!("💾 Upserted asteroid {} (id {})", stored.name, stored.id);
        Ok(stored)
    }

    async fn set_cache(
        &self,
        key: &str,
        data: serde_json::Value,
        ttl_minutes: i64,
    ) -> Result<(), StoreError> {
        let _guard = self.cache_lock.lock().await;
        let mut cache = self.load_cache().await;
        cache.insert(
            key.to_string(),
            new_cache_entry(data, self.clock.now(), ttl_minutes),
        );
        write_json_pretty(&self.cache_path, &cache).await?;
        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let _guard = self.cache_lock.lock().await;
        let mut cache = self.load_cache().await;
        let (data, purged) = take_live_entry(&mut cache, key, self.clock.now());
        if purged {
            debug!("🗑️  Cache entry {} expired", key);
            write_json_pretty(&self.cache_path, &cache).await?;
        }
        Ok(data)
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let _guard = self.cache_lock.lock().await;
        let mut cache = self.load_cache().await;
        let removed = remove_expired(&mut cache, self.clock.now());
        if removed > 0 {
            write_json_pretty(&self.cache_path, &cache).await?;
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let records = self.load().await;
        let db_size = tokio::fs::metadata(&self.asteroids_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        Ok(summarize(
            &records,
            self.asteroids_path.display().to_string(),
            db_size,
        ))
    }
}

/// In-process store with the same semantics, for tests and ephemeral runs.
pub struct MemoryAsteroidStore {
    records: Mutex<Vec<Asteroid>>,
    cache: Mutex<CacheMap>,
    clock: Arc<dyn Clock>,
}

impl MemoryAsteroidStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            cache: Mutex::new(CacheMap::new()),
            clock,
        }
    }

    /// Number of entries physically present, expired or not.
    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl AsteroidStore for MemoryAsteroidStore {
    async fn get_all(&self) -> Result<Vec<Asteroid>, StoreError> {
        Ok(sorted_by_distance(self.records.lock().await.clone()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Asteroid>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn get_hazardous(&self) -> Result<Vec<Asteroid>, StoreError> {
        Ok(hazardous_only(self.records.lock().await.clone()))
    }

    async fn get_by_size(&self, min: i64, max: i64) -> Result<Vec<Asteroid>, StoreError> {
        Ok(within_size(self.records.lock().await.clone(), min, max))
    }

    async fn upsert(&self, input: AsteroidInput) -> Result<Asteroid, StoreError> {
        let mut records = self.records.lock().await;
        Ok(apply_upsert(&mut records, input, self.clock.now()))
    }

    async fn set_cache(
        &self,
        key: &str,
        data: serde_json::Value,
        ttl_minutes: i64,
    ) -> Result<(), StoreError> {
        self.cache.lock().await.insert(
            key.to_string(),
            new_cache_entry(data, self.clock.now(), ttl_minutes),
        );
        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let mut cache = self.cache.lock().await;
        Ok(take_live_entry(&mut cache, key, self.clock.now()).0)
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let mut cache = self.cache.lock().await;
        Ok(remove_expired(&mut cache, self.clock.now()))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let records = self.records.lock().await;
        Ok(summarize(&records, ":memory:".to_string(), 0))
    }
}
