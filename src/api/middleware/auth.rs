use crate::AppState;
use crate::api::error::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Rejects requests without a valid bearer token and attaches the token's
/// `Claims` for handlers. Whether the user still exists is left to the
/// handler so it can answer 404 rather than 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = state.accounts.authenticate(header)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
