use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forum::config::{Cli, Config};
use forum::db;
use forum::routes;
use forum::state::AppState;

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

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::router(AppState::new(pool, config));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
