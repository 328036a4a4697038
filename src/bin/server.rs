use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use matchpool::{
    http, AppState, AuthConfig, Config, MatchStore, PgStore, ResultApplier, ResultDispatcher,
    TrueSkill,
};

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

    let applier = ResultApplier::new(store.clone());
    let dispatcher = ResultDispatcher::start(applier);

    let state = AppState {
        store,
        dispatcher,
        rating_env: TrueSkill::default(),
        auth: AuthConfig {
            api_key: config.api_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
            access_ttl_min: config.access_ttl_min,
        },
    };
    let app = http::router(state);

    info!(addr = %config.bind_addr, "serving matchmaking API");
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| matchpool::MatchPoolError::OperationFailed(err.to_string()))?;

    Ok(())
}
