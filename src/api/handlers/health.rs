use crate::AppState;
use crate::models::StoreStats;
use axum::{Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub server: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: Option<StoreStats>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.asteroids.stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!("⚠️  Health check could not read store stats: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: "OK".to_string(),
        server: "NASA Data API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: state.clock.now(),
        database,
    })
}
