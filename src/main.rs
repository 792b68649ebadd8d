use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forum::config::{Cli, Config};
use forum::state::AppState;
use forum::{auth, db};

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
    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(&config.storage.uploads)?;

    // Initialize database
    let pool = db::create_pool(&config.database.path)?;
    db::run_migrations(&pool)?;

    // Expired sessions accumulate otherwise; sweep now and then hourly
    let purged = auth::session::purge_expired(&pool)?;
    if purged > 0 {
        tracing::info!(purged, "purged expired sessions");
    }
    let janitor_pool = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            match auth::session::purge_expired(&janitor_pool) {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "purged expired sessions"),
                Err(e) => tracing::warn!("session purge failed: {}", e),
            }
        }
    });

    // Build app state and router
    let state = AppState {
        db: pool,
        config: config.clone(),
    };
    let app = forum::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
