use crate::AppState;
use crate::api::error::AppError;
use crate::models::{AsteroidFeed, AsteroidView, StoreStats};
use crate::services::asteroid_service::RefreshSummary;
use axum::{
    Json,
    extract::{Path, State},
};

#[utoipa::path(
    get,
    path = "/api/asteroids",
    responses(
        (status = 200, description = "Today's asteroids (cache, store, then live feed)", body = AsteroidFeed),
        (status = 500, description = "Live feed unavailable and nothing stored")
    ),
    tag = "asteroids"
)]
pub async fn list_asteroids(State(state): State<AppState>) -> Result<Json<AsteroidFeed>, AppError> {
    Ok(Json(state.asteroids.todays_asteroids().await?))
}

#[utoipa::path(
    get,
    path = "/api/asteroids/hazardous",
    responses(
        (status = 200, description = "Potentially hazardous asteroids, nearest first", body = Vec<AsteroidView>)
    ),
    tag = "asteroids"
)]
pub async fn hazardous_asteroids(
    State(state): State<AppState>,
) -> Result<Json<Vec<AsteroidView>>, AppError> {
    Ok(Json(state.asteroids.hazardous().await?))
}

fn parse_bound(raw: &str, label: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} size: '{}'", label, raw)))
}

#[utoipa::path(
    get,
    path = "/api/asteroids/size/{min}/{max}",
    params(
        ("min" = i64, Path, description = "Minimum diameter in meters (inclusive)"),
        ("max" = i64, Path, description = "Maximum diameter in meters (inclusive)")
    ),
    responses(
        (status = 200, description = "Asteroids in the size range, largest first", body = Vec<AsteroidView>),
        (status = 400, description = "Non-integer bounds")
    ),
    tag = "asteroids"
)]
pub async fn asteroids_by_size(
    State(state): State<AppState>,
    Path((min, max)): Path<(String, String)>,
) -> Result<Json<Vec<AsteroidView>>, AppError> {
    let min = parse_bound(&min, "minimum")?;
    let max = parse_bound(&max, "maximum")?;
    Ok(Json(state.asteroids.by_size(min, max).await?))
}

#[utoipa::path(
    get,
    path = "/api/asteroids/{name}",
    params(("name" = String, Path, description = "Asteroid name")),
    responses(
        (status = 200, description = "Asteroid found", body = AsteroidView),
        (status = 404, description = "Unknown asteroid")
    ),
    tag = "asteroids"
)]
pub async fn asteroid_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AsteroidView>, AppError> {
    Ok(Json(state.asteroids.by_name(&name).await?))
}

#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "Feed re-fetched and stored", body = RefreshSummary),
        (status = 500, description = "Live feed unavailable")
    ),
    tag = "asteroids"
)]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshSummary>, AppError> {
    Ok(Json(state.asteroids.refresh().await?))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Store statistics", body = StoreStats)
    ),
    tag = "asteroids"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.asteroids.stats().await?))
}
