#![allow(dead_code)]

use asteroid_dashboard::config::AppConfig;
use asteroid_dashboard::models::{AsteroidInput, LooseValue};
use asteroid_dashboard::services::account_service::AccountService;
use asteroid_dashboard::services::asteroid_service::AsteroidService;
use asteroid_dashboard::services::asteroid_store::MemoryAsteroidStore;
use asteroid_dashboard::services::feed::{FeedClient, FeedError};
use asteroid_dashboard::services::user_store::MemoryUserStore;
use asteroid_dashboard::utils::clock::ManualClock;
use asteroid_dashboard::{AppState, ServiceMode, create_app};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

/// Feed double that returns a fixed batch (or fails) and counts calls.
pub struct ScriptedFeed {
    calls: AtomicUsize,
    records: Vec<AsteroidInput>,
    fail: bool,
}

impl ScriptedFeed {
    pub fn returning(records: Vec<AsteroidInput>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            records,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            records: vec![],
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
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

pub fn rock(name: &str, distance: f64, size: i64, hazardous: bool) -> AsteroidInput {
    AsteroidInput {
        name: name.to_string(),
        velocity: LooseValue::from(12.34),
        distance: LooseValue::from(distance),
        size: LooseValue::from(size),
        is_hazardous: LooseValue::from(hazardous),
        approach_date: Some("2025-Mar-14 08:00".to_string()),
    }
}

pub fn sample_rocks() -> Vec<AsteroidInput> {
    vec![
        rock("(2025 AB)", 4.5, 150, true),
        rock("(2025 CD)", 1.2, 80, false),
        rock("(2025 EF)", 9.9, 420, true),
    ]
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub feed: Arc<ScriptedFeed>,
    pub clock: Arc<ManualClock>,
    pub dir: TempDir,
}

pub fn test_app(mode: ServiceMode, feed: Arc<ScriptedFeed>) -> TestApp {
    test_app_with(mode, feed, |_| {})
}

pub fn test_app_with(
    mode: ServiceMode,
    feed: Arc<ScriptedFeed>,
    configure: impl FnOnce(&mut AppConfig),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig {
        jwt_secret: SECRET.to_string(),
        data_dir: dir.path().join("data"),
        uploads_dir: dir.path().join("uploads"),
        public_dir: dir.path().join("public"),
        ..AppConfig::default()
    };
    configure(&mut config);

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryAsteroidStore::new(clock.clone()));
    let asteroids = Arc::new(AsteroidService::new(
        store,
        feed.clone(),
        clock.clone(),
        config.cache_ttl_minutes,
    ));
    let accounts = Arc::new(AccountService::new(
        Arc::new(MemoryUserStore::new()),
        clock.clone(),
        config.jwt_secret.clone(),
        chrono::Duration::days(config.token_ttl_days),
        config.default_avatar_url.clone(),
    ));

    let state = AppState {
        asteroids,
        accounts,
        clock: clock.clone(),
        config,
        http: reqwest::Client::new(),
    };

    TestApp {
        router: create_app(state.clone(), mode),
        state,
        feed,
        clock,
        dir,
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Signs up `username` and returns the session token.
pub async fn signup(router: &Router, username: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "hunter22",
                "confirmPassword": "hunter22",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}
