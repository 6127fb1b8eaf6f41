use crate::models::{Asteroid, AsteroidFeed, AsteroidView, StoreStats};
use crate::services::asteroid_store::{AsteroidStore, StoreError};
use crate::services::feed::{FeedClient, FeedError};
use crate::utils::clock::Clock;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

pub const STALE_DATA_WARNING: &str = "Live feed unavailable; serving stored asteroid data";

#[derive(Debug, Error)]
pub enum AsteroidError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Asteroid not found: {0}")]
    NotFound(String),

    #[error("Cache payload error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub message: String,
    pub count: usize,
    pub expired_cache_entries_removed: usize,
}

pub fn cache_key(date: NaiveDate) -> String {
    format!("asteroids_{}", date.format("%Y-%m-%d"))
}

/// Answers asteroid queries from cache, then the store, then the remote feed.
pub struct AsteroidService {
    store: Arc<dyn AsteroidStore>,
    feed: Arc<dyn FeedClient>,
    clock: Arc<dyn Clock>,
    cache_ttl_minutes: i64,
}

impl AsteroidService {
    pub fn new(
        store: Arc<dyn AsteroidStore>,
        feed: Arc<dyn FeedClient>,
        clock: Arc<dyn Clock>,
        cache_ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            feed,
            clock,
            cache_ttl_minutes,
        }
    }

    pub fn store(&self) -> &Arc<dyn AsteroidStore> {
        &self.store
    }

    /// Today's asteroid envelope.
    ///
    /// The store tier answers with every stored record, not only those
    /// approaching today, once anything has been ingested.
    pub async fn todays_asteroids(&self) -> Result<AsteroidFeed, AsteroidError> {
        let today = self.clock.today();
        let key = cache_key(today);

        if let Some(cached) = self.store.get_cache(&key).await? {
            match serde_json::from_value::<AsteroidFeed>(cached) {
                Ok(feed) => {
                    info!("⚡ Serving asteroids from cache ({})", key);
                    return Ok(feed);
                }
                Err(e) => warn!("⚠️  Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let stored = self.store.get_all().await?;
        if !stored.is_empty() {
            info!("💾 Serving {} asteroids from store", stored.len());
            let feed = AsteroidFeed::from_records(&stored);
            self.cache(&key, &feed).await?;
            return Ok(feed);
        }

        match self.fetch_and_store(today).await {
            Ok(records) => {
                info!("🌍 Serving {} asteroids from live feed", records.len());
                let feed = AsteroidFeed::from_records(&sorted(records));
                self.cache(&key, &feed).await?;
                Ok(feed)
            }
            Err(e) => {
                warn!("❌ Live feed failed: {}", e);
                let fallback = self.store.get_all().await?;
                if fallback.is_empty() {
                    return Err(e);
                }
                Ok(AsteroidFeed::from_records(&fallback).with_warning(STALE_DATA_WARNING))
            }
        }
    }

    pub async fn hazardous(&self) -> Result<Vec<AsteroidView>, AsteroidError> {
        Ok(views(&self.store.get_hazardous().await?))
    }

    pub async fn by_size(&self, min: i64, max: i64) -> Result<Vec<AsteroidView>, AsteroidError> {
        Ok(views(&self.store.get_by_size(min, max).await?))
    }

    pub async fn by_name(&self, name: &str) -> Result<AsteroidView, AsteroidError> {
        self.store
            .get_by_name(name)
            .await?
            .map(|a| AsteroidView::from(&a))
            .ok_or_else(|| AsteroidError::NotFound(name.to_string()))
    }

    /// Re-fetches today regardless of cache or store contents.
    pub async fn refresh(&self) -> Result<RefreshSummary, AsteroidError> {
        let today = self.clock.today();
        let records = self.fetch_and_store(today).await?;
        let removed = self.store.sweep_expired().await?;

        let feed = AsteroidFeed::from_records(&sorted(records));
        self.cache(&cache_key(today), &feed).await?;

        info!(
            "🔄 Refreshed {} asteroids, swept {} expired cache entries",
            feed.count, removed
        );
        Ok(RefreshSummary {
            message: "Asteroid data refreshed".to_string(),
            count: feed.count,
            expired_cache_entries_removed: removed,
        })
    }

    pub async fn stats(&self) -> Result<StoreStats, AsteroidError> {
        Ok(self.store.stats().await?)
    }

    async fn fetch_and_store(&self, date: NaiveDate) -> Result<Vec<Asteroid>, AsteroidError> {
        let inputs = self.feed.fetch_day(date).await?;
        Ok(self.store.bulk_upsert(inputs).await?)
    }

    async fn cache(&self, key: &str, feed: &AsteroidFeed) -> Result<(), AsteroidError> {
        let payload = serde_json::to_value(feed)?;
        self.store
            .set_cache(key, payload, self.cache_ttl_minutes)
            .await?;
        Ok(())
    }
}

fn sorted(records: Vec<Asteroid>) -> Vec<Asteroid> {
    crate::services::asteroid_store::sorted_by_distance(records)
}

fn views(records: &[Asteroid]) -> Vec<AsteroidView> {
    records.iter().map(AsteroidView::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AsteroidInput, LooseValue};
    use crate::services::asteroid_store::MemoryAsteroidStore;
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFeed {
        calls: AtomicUsize,
        records: Vec<AsteroidInput>,
        fail: bool,
    }

    impl ScriptedFeed {
        fn returning(records: Vec<AsteroidInput>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                records,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                records: vec![],
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedClient for ScriptedFeed {
        async fn fetch_day(&self, _date: NaiveDate) -> Result<Vec<AsteroidInput>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FeedError::Status(503));
            }
            Ok(self.records.clone())
        }
    }

    fn rock(name: &str, distance: f64) -> AsteroidInput {
        AsteroidInput {
            name: name.to_string(),
            velocity: LooseValue::from(11.0),
            distance: LooseValue::from(distance),
            size: LooseValue::from(120_i64),
            is_hazardous: LooseValue::from(false),
            approach_date: Some("2025-Mar-14 01:00".to_string()),
        }
    }

    fn setup(feed: Arc<ScriptedFeed>) -> (AsteroidService, Arc<MemoryAsteroidStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryAsteroidStore::new(clock.clone()));
        let service = AsteroidService::new(store.clone(), feed, clock.clone(), 60);
        (service, store, clock)
    }

    #[tokio::test]
    async fn test_empty_cache_and_store_calls_feed() {
        let feed = ScriptedFeed::returning(vec![rock("far", 9.0), rock("near", 1.0)]);
        let (service, store, _) = setup(feed.clone());

        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(feed.calls(), 1);
        assert_eq!(result.count, 2);
        assert_eq!(result.asteroids[0].name, "near");
        assert!(result.warning.is_none());
        assert_eq!(store.get_all().await.unwrap().len(), 2);
        assert!(store.get_cache("asteroids_2025-03-14").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_populated_cache_skips_feed_and_store() {
        let feed = ScriptedFeed::returning(vec![rock("live", 1.0)]);
        let (service, store, _) = setup(feed.clone());

        let cached = AsteroidFeed {
            count: 0,
            asteroids: vec![],
            warning: None,
        };
        store
            .set_cache(
                "asteroids_2025-03-14",
                serde_json::to_value(&cached).unwrap(),
                60,
            )
            .await
            .unwrap();
        store.upsert(rock("stored", 2.0)).await.unwrap();

        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(result, cached);
        assert_eq!(feed.calls(), 0);
    }

    #[tokio::test]
    async fn test_populated_store_skips_feed_and_fills_cache() {
        let feed = ScriptedFeed::returning(vec![rock("live", 1.0)]);
        let (service, store, _) = setup(feed.clone());
        store.upsert(rock("stored", 2.0)).await.unwrap();

        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(feed.calls(), 0);
        assert_eq!(result.count, 1);
        assert_eq!(result.asteroids[0].name, "stored");
        assert!(store.get_cache("asteroids_2025-03-14").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_tier_includes_records_from_previous_days() {
        let feed = ScriptedFeed::returning(vec![]);
        let (service, store, clock) = setup(feed.clone());
        store.upsert(rock("yesterday's rock", 3.0)).await.unwrap();

        clock.advance(Duration::days(1));
        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(feed.calls(), 0);
        assert_eq!(result.asteroids[0].name, "yesterday's rock");
    }

    #[tokio::test]
    async fn test_expired_cache_falls_through_to_store() {
        let feed = ScriptedFeed::returning(vec![]);
        let (service, store, clock) = setup(feed.clone());

        let first = service.todays_asteroids().await.unwrap();
        assert_eq!(first.count, 0);

        store.upsert(rock("later", 1.0)).await.unwrap();
        let still_cached = service.todays_asteroids().await.unwrap();
        assert_eq!(still_cached.count, 0);

        clock.advance(Duration::minutes(61));

        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(result.asteroids[0].name, "later");
    }

    #[tokio::test]
    async fn test_feed_failure_with_empty_store_is_error() {
        let feed = ScriptedFeed::failing();
        let (service, _, _) = setup(feed.clone());
        let err = service.todays_asteroids().await.unwrap_err();
        assert!(matches!(err, AsteroidError::Feed(_)));
        assert_eq!(feed.calls(), 1);
    }

    /// Accepts a fixed number of upserts, then fails every write.
    struct FailingAfter {
        inner: MemoryAsteroidStore,
        remaining: AtomicUsize,
    }

    #[async_trait]
    impl AsteroidStore for FailingAfter {
        async fn get_all(&self) -> Result<Vec<Asteroid>, StoreError> {
            self.inner.get_all().await
        }
        async fn get_by_name(&self, name: &str) -> Result<Option<Asteroid>, StoreError> {
            self.inner.get_by_name(name).await
        }
        async fn get_hazardous(&self) -> Result<Vec<Asteroid>, StoreError> {
            self.inner.get_hazardous().await
        }
        async fn get_by_size(&self, min: i64, max: i64) -> Result<Vec<Asteroid>, StoreError> {
            self.inner.get_by_size(min, max).await
        }
        async fn upsert(&self, input: AsteroidInput) -> Result<Asteroid, StoreError> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            self.inner.upsert(input).await
        }
        async fn set_cache(
            &self,
            key: &str,
            data: serde_json::Value,
            ttl_minutes: i64,
        ) -> Result<(), StoreError> {
            self.inner.set_cache(key, data, ttl_minutes).await
        }
        async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            self.inner.get_cache(key).await
        }
        async fn sweep_expired(&self) -> Result<usize, StoreError> {
            self.inner.sweep_expired().await
        }
        async fn stats(&self) -> Result<StoreStats, StoreError> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn test_partial_ingest_failure_serves_stale_with_warning() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap(),
        ));
        let store = Arc::new(FailingAfter {
            inner: MemoryAsteroidStore::new(clock.clone()),
            remaining: AtomicUsize::new(1),
        });
        let feed = ScriptedFeed::returning(vec![rock("first", 1.0), rock("second", 2.0)]);
        let service = AsteroidService::new(store.clone(), feed.clone(), clock, 60);

        let result = service.todays_asteroids().await.unwrap();
        assert_eq!(feed.calls(), 1);
        assert_eq!(result.count, 1);
        assert_eq!(result.asteroids[0].name, "first");
        assert_eq!(result.warning.as_deref(), Some(STALE_DATA_WARNING));
    }

    #[tokio::test]
    async fn test_refresh_forces_fetch_and_sweeps() {
        let feed = ScriptedFeed::returning(vec![rock("fresh", 1.0)]);
        let (service, store, clock) = setup(feed.clone());
        store.upsert(rock("stored", 2.0)).await.unwrap();
        store
            .set_cache("asteroids_2025-03-13", serde_json::json!({}), 10)
            .await
            .unwrap();
        clock.advance(Duration::minutes(11));

        let summary = service.refresh().await.unwrap();
        assert_eq!(feed.calls(), 1);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.expired_cache_entries_removed, 1);
        assert_eq!(store.get_all().await.unwrap().len(), 2);

        let today: AsteroidFeed = serde_json::from_value(
            store
                .get_cache("asteroids_2025-03-14")
                .await
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(today.asteroids[0].name, "fresh");
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_error() {
        let (service, _, _) = setup(ScriptedFeed::failing());
        assert!(matches!(
            service.refresh().await,
            Err(AsteroidError::Feed(_))
        ));
    }

    #[tokio::test]
    async fn test_by_name_not_found() {
        let (service, _, _) = setup(ScriptedFeed::returning(vec![]));
        assert!(matches!(
            service.by_name("nope").await,
            Err(AsteroidError::NotFound(name)) if name == "nope"
        ));
    }
}
