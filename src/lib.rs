pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::account_service::AccountService;
use crate::services::asteroid_service::AsteroidService;
use crate::utils::clock::Clock;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{any, delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::asteroids::list_asteroids,
        api::handlers::asteroids::hazardous_asteroids,
        api::handlers::asteroids::asteroids_by_size,
        api::handlers::asteroids::asteroid_by_name,
        api::handlers::asteroids::refresh,
        api::handlers::asteroids::stats,
        api::handlers::health::health_check,
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::users::get_profile,
        api::handlers::users::update_profile,
        api::handlers::users::add_watched_asteroid,
        api::handlers::users::list_watched_asteroids,
        api::handlers::users::remove_watched_asteroid,
    ),
    components(
        schemas(
            models::AsteroidView,
            models::AsteroidFeed,
            models::StoreStats,
            models::WatchedAsteroid,
            models::PublicUser,
            services::asteroid_service::RefreshSummary,
            services::account_service::SignupForm,
            services::account_service::LoginForm,
            services::account_service::AuthSession,
            api::handlers::health::HealthResponse,
            api::handlers::users::AddWatchRequest,
            api::handlers::users::WatchlistResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "asteroids", description = "Near-Earth object data"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "user", description = "Profile and watchlist endpoints"),
        (name = "system", description = "Health and statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Which route groups this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ServiceMode {
    /// Asteroid and account routes in one process
    #[default]
    All,
    /// Asteroid routes; account routes are forwarded to AUTH_SERVICE_URL
    Asteroids,
    /// Account routes only
    Auth,
}

impl ServiceMode {
    pub fn serves_asteroids(self) -> bool {
        matches!(self, ServiceMode::All | ServiceMode::Asteroids)
    }

    pub fn serves_accounts(self) -> bool {
        matches!(self, ServiceMode::All | ServiceMode::Auth)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub asteroids: Arc<AsteroidService>,
    pub accounts: Arc<AccountService>,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
    pub http: reqwest::Client,
}

fn asteroid_routes() -> Router<AppState> {
    Router::new()
        .route("/api/asteroids", get(api::handlers::asteroids::list_asteroids))
        .route(
            "/api/asteroids/hazardous",
            get(api::handlers::asteroids::hazardous_asteroids),
        )
        .route(
            "/api/asteroids/size/:min/:max",
            get(api::handlers::asteroids::asteroids_by_size),
        )
        .route(
            "/api/asteroids/:name",
            get(api::handlers::asteroids::asteroid_by_name),
        )
        .route("/api/refresh", post(api::handlers::asteroids::refresh))
        .route("/api/stats", get(api::handlers::asteroids::stats))
}

fn account_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/user/me", get(api::handlers::users::get_profile))
        .route(
            "/api/user/profile",
            put(api::handlers::users::update_profile).layer(DefaultBodyLimit::max(
                state.config.max_avatar_size + 1024 * 1024, // multipart overhead
            )),
        )
        .route(
            "/api/user/watched-asteroid",
            post(api::handlers::users::add_watched_asteroid),
        )
        .route(
            "/api/user/watched-asteroids",
            get(api::handlers::users::list_watched_asteroids),
        )
        .route(
            "/api/user/watched-asteroid/:id",
            delete(api::handlers::users::remove_watched_asteroid),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/api/auth/signup", post(api::handlers::auth::signup))
        .route("/api/auth/login", post(api::handlers::auth::login))
        .merge(protected)
}

fn proxied_account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/auth/*rest",
            any(api::handlers::proxy::forward_to_auth_service),
        )
        .route(
            "/api/user/*rest",
            any(api::handlers::proxy::forward_to_auth_service),
        )
}

pub fn create_app(state: AppState, mode: ServiceMode) -> Router {
    let mut router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(api::handlers::health::health_check));

    if mode.serves_asteroids() {
        router = router.merge(asteroid_routes());
    }
    if mode.serves_accounts() {
        router = router.merge(account_routes(&state));
    } else if state.config.auth_service_url.is_some() {
        router = router.merge(proxied_account_routes());
    }

    let public_dir = &state.config.public_dir;
    let dashboard =
        ServeDir::new(public_dir).not_found_service(ServeFile::new(public_dir.join("index.html")));

    router
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        .fallback_service(dashboard)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
