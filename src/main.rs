use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use social_network::config::{Cli, Config};
use social_network::db::{self, SocialRepository, SqliteRepository};
use social_network::routes;
use social_network::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path(), config.store_timeout())?;
    db::run_migrations(&pool)?;

    let repo = SqliteRepository::new(pool, config.store_timeout());

    // Repair counters left ahead of liked sets by interrupted likes
    let corrected = repo.reconcile_all_likes().await?;
    if corrected > 0 {
        tracing::warn!("Reconciled likes counter on {} post(s)", corrected);
    }

    let state = AppState::new(Arc::new(repo), config.clone());
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
