use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use matchpool::{Config, MatchStore, MatcherRunner, PgStore};

#[tokio::main]
async fn main() -> matchpool::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;

    let store = PgStore::connect(&config.database_url).await?;
    store.ensure_schema(30, Duration::from_secs(1)).await?;
    let store: Arc<dyn MatchStore> = Arc::new(store);

    let runner = Arc::new(MatcherRunner::new(
        store,
        config.regions.clone(),
        config.split_beta,
        config.tick_interval,
    ));

    let worker = {
        let runner = runner.clone();
        tokio::spawn(async move {
            if let Err(err) = runner.run().await {
                error!(%err, "matcher runner exited");
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    runner.stop();
    let _ = worker.await;

    Ok(())
}
