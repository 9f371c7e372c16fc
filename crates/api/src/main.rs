//! FloraChat API server entrypoint

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use florachat_api::{routes, AppState, Config};
use florachat_shared::RedisStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = RedisStore::connect(&config.redis_url).await?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, Arc::new(store));
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "FloraChat API listening");
    axum::serve(listener, router).await?;

    Ok(())
}
