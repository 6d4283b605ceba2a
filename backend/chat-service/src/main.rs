use std::sync::Arc;

use chat_service::{
    config::Config, db, error::AppError, migrations, routes, state::AppState,
    storage::S3BlobStore, websocket::pubsub, websocket::ConnectionRegistry,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Arc::new(Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;

    // Embedded migrations are idempotent; schema drift is fatal.
    migrations::run_all(&db)
        .await
        .map_err(|e| AppError::StartServer(format!("migrations: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.clone())
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;
    let registry = ConnectionRegistry::new();
    let blob = Arc::new(S3BlobStore::from_env(&cfg).await);

    let state = AppState {
        db,
        registry: registry.clone(),
        redis: redis.clone(),
        config: cfg.clone(),
        blob,
    };

    // Bridge broker events into local sockets; runs for the process
    // lifetime and only logs on failure (delivery is best-effort).
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_psub_listener(redis, registry).await {
            tracing::error!(error = %e, "pub/sub listener exited");
        }
    });

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {bind_addr}: {e}")))?;
    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;

    Ok(())
}
