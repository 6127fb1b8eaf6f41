use crate::AppState;
use crate::api::error::AppError;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, header},
    response::Response,
};

const MAX_FORWARDED_BODY: usize = 8 * 1024 * 1024;

fn unavailable(message: impl Into<String>, details: Option<String>) -> AppError {
    AppError::Upstream {
        error: "Auth service unavailable".to_string(),
        message: message.into(),
        details,
    }
}

/// Forwards an account request to the external auth service and relays its
/// status, content type and body unchanged.
pub async fn forward_to_auth_service(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, AppError> {
    let Some(base) = state.config.auth_service_url.as_deref() else {
        return Err(unavailable("No auth service configured", None));
    };

    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", base, path);

    let body = to_bytes(body, MAX_FORWARDED_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let mut upstream = state.http.request(parts.method.clone(), &url);
    for name in [header::AUTHORIZATION, header::CONTENT_TYPE] {
        if let Some(value) = parts.headers.get(&name) {
            upstream = upstream.header(name, value.clone());
        }
    }

    tracing::debug!("🔀 Forwarding {} {} to {}", parts.method, path, url);

    let resp = upstream.body(body).send().await.map_err(|e| {
        unavailable(
            "Failed to reach the auth service",
            Some(e.to_string()),
        )
    })?;

    let status = resp.status();
    let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| unavailable("Auth service response was interrupted", Some(e.to_string())))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        content_type.unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    Ok(response)
}
