// src/main.rs

use std::{net::SocketAddr, sync::Arc};

use quizzard::{
    config::Config,
    repositories::{DynRepository, MemoryRepository, PgRepository},
    routes,
    services::trivia::{TriviaService, provider::OpenTdbClient},
    state::AppState,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let repo: DynRepository = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store, data is lost on shutdown");
        Arc::new(MemoryRepository::new())
    } else {
        Arc::new(PgRepository::connect(&config.database_url).await?)
    };

    let provider = OpenTdbClient::new(config.trivia_api_url.clone())?;
    tracing::info!("Trivia upstream: {}", config.trivia_api_url);
    let trivia = Arc::new(TriviaService::new(Arc::new(provider)));

    let state = AppState {
        repo,
        config: config.clone(),
        trivia,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Quizzard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
