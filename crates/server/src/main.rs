use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use orchestrator::{HttpDriver, ScrapeRunner, SequenceScheduler};
use server::config::OutreachConfig;
use server::state::AppState;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path =
        std::env::var("OUTREACH_CONFIG").unwrap_or_else(|_| "outreach.json".to_string());
    let config = OutreachConfig::read(Path::new(&config_path)).await;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let driver = Arc::new(HttpDriver::new(
        &config.bridge_url,
        Duration::from_secs(config.bridge_timeout_secs),
    )?);

    let state = AppState::new(pool, driver, &config);

    // A session persisted as running cannot have survived the restart.
    let recovered = ScrapeRunner::recover_on_boot(&state.scrape_deps).await?;
    if !recovered.is_empty() {
        tracing::info!(count = recovered.len(), "Recovered interrupted sessions as paused");
    }

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = SequenceScheduler::new(config.scheduler_config(), state.sequence_deps());
    tokio::spawn(scheduler.run(shutdown_rx));

    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
