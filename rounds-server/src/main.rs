use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rounds_core::{InspectionService, PgStore, SystemClock};
use rounds_server::{
    AppState, Config, ConfigLoad, routes, sweep_task::spawn_sweep_task,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let ConfigLoad {
        config,
        env_file_loaded,
    } = Config::load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let store = Arc::new(PgStore::new(pool));
    store
        .run_migrations()
        .await
        .context("database migration failed")?;

    let service = Arc::new(
        InspectionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(SystemClock),
        )
        .with_buffer_days(config.buffer_days),
    );

    let state = AppState {
        service: Arc::clone(&service),
        directory: store.clone(),
        sessions: store.clone(),
    };

    let sweep_handle = spawn_sweep_task(
        service,
        Duration::from_secs(config.sweep_interval_secs),
    );
    info!(
        interval_secs = config.sweep_interval_secs,
        "background sweep scheduled"
    );

    let app = routes::create_api_router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    sweep_handle.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install ctrl-c handler");
        // Fall through and keep serving; the process can still be killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
