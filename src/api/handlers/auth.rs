use crate::AppState;
use crate::api::error::AppError;
use crate::services::account_service::{AuthSession, LoginForm, SignupForm};
use axum::{Json, extract::State, http::StatusCode};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupForm,
    responses(
        (status = 201, description = "User registered successfully", body = AuthSession),
        (status = 400, description = "Missing fields, password mismatch or too short"),
        (status = 409, description = "Username or email already exists")
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupForm>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let session = state.accounts.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Login successful", body = AuthSession),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginForm>,
) -> Result<Json<AuthSession>, AppError> {
    Ok(Json(state.accounts.login(payload).await?))
}
