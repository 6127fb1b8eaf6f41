use asteroid_dashboard::config::AppConfig;
use asteroid_dashboard::infrastructure::{database, seed};
use asteroid_dashboard::utils::clock::SystemClock;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Load an asteroid seed document into the data directory")]
struct Args {
    /// Seed document: `{"asteroids": [...]}` or a bare array
    #[arg(env = "SEED_FILE")]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,asteroid_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();

    info!("🌱 Starting asteroid seeder...");
    let stores = database::setup_database(&config, Arc::new(SystemClock)).await?;

    match seed::seed_store(stores.asteroids.as_ref(), &args.file).await {
        Ok(report) => {
            info!(
                "✅ Seeded {} records into {}",
                report.upserted, report.stats.db_path
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Seeding failed: {}", e);
            Err(e.into())
        }
    }
}
