use crate::AppState;
use crate::api::error::AppError;
use crate::models::{LooseValue, PublicUser, WatchedAsteroid};
use crate::services::account_service::ProfileUpdate;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

const ALLOWED_AVATAR_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddWatchRequest {
    #[schema(value_type = Option<String>)]
    pub asteroid_id: Option<LooseValue>,
    pub asteroid_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistResponse {
    pub message: String,
    pub watched_asteroids: Vec<WatchedAsteroid>,
}

#[utoipa::path(
    get,
    path = "/api/user/me",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = PublicUser),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "user"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(state.accounts.profile(&claims.sub).await?))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Avatar exceeds the upload limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Checks the declared and sniffed type of an avatar and writes it under
/// the uploads directory, returning the file path and its public URL.
async fn save_avatar(
    state: &AppState,
    user_id: &str,
    declared: Option<String>,
    data: &[u8],
) -> Result<(PathBuf, String), AppError> {
    if data.is_empty() {
        return Err(AppError::BadRequest("Avatar file is empty".to_string()));
    }
    if data.len() > state.config.max_avatar_size {
        return Err(AppError::PayloadTooLarge(format!(
            "Avatar exceeds {} bytes",
            state.config.max_avatar_size
        )));
    }

    let declared_ok = declared
        .as_deref()
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .is_some_and(|m| ALLOWED_AVATAR_TYPES.contains(&m.essence_str()));
    let sniffed = infer::get(data).filter(|t| ALLOWED_AVATAR_TYPES.contains(&t.mime_type()));

    let kind = match sniffed {
        Some(kind) if declared_ok => kind,
        _ => return Err(AppError::BadRequest("Only JPG/PNG allowed".to_string())),
    };

    let filename = format!(
        "avatar-{}-{}.{}",
        user_id,
        state.clock.now().timestamp_millis(),
        kind.extension()
    );
    let dir = &state.config.uploads_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to prepare uploads dir: {}", e)))?;
    let path = dir.join(&filename);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save avatar: {}", e)))?;

    tracing::info!("🖼️  Stored avatar {} for user {}", filename, user_id);
    Ok((path, format!("/uploads/{}", filename)))
}

#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body(content = Object, description = "`username` text field and optional `avatar` image (JPG/PNG)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile updated successfully", body = PublicUser),
        (status = 400, description = "Invalid upload"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username taken"),
        (status = 413, description = "Avatar too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "user"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<PublicUser>, AppError> {
    // 404 before anything touches the disk
    state.accounts.profile(&claims.sub).await?;

    let mut update = ProfileUpdate::default();
    let mut avatar: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" | "name" => {
                update.username = Some(field.text().await.map_err(multipart_error)?);
            }
            "avatar" => {
                let declared = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                avatar = Some((declared, data.to_vec()));
            }
            _ => {}
        }
    }

    let mut saved = None;
    if let Some((declared, data)) = avatar {
        let (path, url) = save_avatar(&state, &claims.sub, declared, &data).await?;
        update.avatar_url = Some(url);
        saved = Some(path);
    }

    match state.accounts.update_profile(&claims.sub, update).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            // the profile never pointed at it
            if let Some(path) = saved {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("⚠️  Could not remove unused avatar {}: {}", path.display(), rm);
                }
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/user/watched-asteroid",
    request_body = AddWatchRequest,
    responses(
        (status = 201, description = "Asteroid added to watchlist", body = WatchlistResponse),
        (status = 400, description = "Missing fields or already watched"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "user"
)]
pub async fn add_watched_asteroid(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddWatchRequest>,
) -> Result<(StatusCode, Json<WatchlistResponse>), AppError> {
    let asteroid_id = payload
        .asteroid_id
        .map(|id| id.to_key())
        .unwrap_or_default();
    let asteroid_name = payload.asteroid_name.unwrap_or_default();

    let watched = state
        .accounts
        .add_watch(&claims.sub, &asteroid_id, &asteroid_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WatchlistResponse {
            message: "Asteroid added to watchlist".to_string(),
            watched_asteroids: watched,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/user/watched-asteroids",
    responses(
        (status = 200, description = "Current watchlist", body = Vec<WatchedAsteroid>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "user"
)]
pub async fn list_watched_asteroids(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<WatchedAsteroid>>, AppError> {
    Ok(Json(state.accounts.watchlist(&claims.sub).await?))
}

#[utoipa::path(
    delete,
    path = "/api/user/watched-asteroid/{id}",
    params(("id" = String, Path, description = "Asteroid id to stop watching")),
    responses(
        (status = 200, description = "Removed (or was not watched)", body = WatchlistResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "user"
)]
pub async fn remove_watched_asteroid(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(asteroid_id): Path<String>,
) -> Result<Json<WatchlistResponse>, AppError> {
    let watched = state
        .accounts
        .remove_watch(&claims.sub, &asteroid_id)
        .await?;

    Ok(Json(WatchlistResponse {
        message: "Asteroid removed from watchlist".to_string(),
        watched_asteroids: watched,
    }))
}
