use asteroid_dashboard::config::AppConfig;
use asteroid_dashboard::infrastructure::{database, listener, seed};
use asteroid_dashboard::services::account_service::AccountService;
use asteroid_dashboard::services::asteroid_service::AsteroidService;
use asteroid_dashboard::services::feed::NasaFeedClient;
use asteroid_dashboard::utils::clock::{Clock, SystemClock};
use asteroid_dashboard::{AppState, ServiceMode, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "asteroid-dashboard", version, about = "Near-Earth asteroid dashboard backend")]
struct Args {
    /// Route groups to serve
    #[arg(long, value_enum, default_value_t = ServiceMode::All, env = "SERVICE_MODE")]
    mode: ServiceMode,

    /// Preferred port, overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asteroid_dashboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("🚀 Starting asteroid dashboard ({:?} mode)...", args.mode);

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    info!(
        "⚙️  Config: cache TTL={}m, token TTL={}d, max avatar={}KB, auth upstream={}",
        config.cache_ttl_minutes,
        config.token_ttl_days,
        config.max_avatar_size / 1024,
        config.auth_service_url.as_deref().unwrap_or("none")
    );
    if config.jwt_secret == AppConfig::default().jwt_secret {
        warn!("⚠️  JWT_SECRET is not set, using the development secret");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Setup Infrastructure
    let stores = database::setup_database(&config, clock.clone()).await?;
    if let Some(seed_file) = &config.seed_file {
        seed::seed_store(stores.asteroids.as_ref(), seed_file).await?;
    }

    let feed = Arc::new(NasaFeedClient::from_config(&config)?);
    let asteroids = Arc::new(AsteroidService::new(
        stores.asteroids.clone(),
        feed,
        clock.clone(),
        config.cache_ttl_minutes,
    ));
    let accounts = Arc::new(AccountService::new(
        stores.users.clone(),
        clock.clone(),
        config.jwt_secret.clone(),
        chrono::Duration::days(config.token_ttl_days),
        config.default_avatar_url.clone(),
    ));

    let state = AppState {
        asteroids,
        accounts,
        clock,
        config: config.clone(),
        http: reqwest::Client::new(),
    };

    let app = create_app(state, args.mode).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    let request_id = response
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    info!(
                        "📤 Finished in {:?} with status {} [{}]",
                        latency,
                        response.status(),
                        request_id
                    );
                },
            ),
    );

    let listener = listener::bind_with_fallback(&config.host, &config.candidate_ports()).await?;
    let addr = listener.local_addr()?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️  Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("⚠️  Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
