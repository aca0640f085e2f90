use crate::app::App;
use crate::cli::{StorageBackendArg, CLI};
use crate::state::AppState;
use anyhow::Context;
use snip_generator::RandomGenerator;
use snip_storage::{InMemoryRepository, JsonFileRepository, SqliteRepository};
use snip_store::{Shortener, StoreSettings, UrlStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Builds the store for the configured backend.
pub async fn build_shortener(config: &CLI) -> anyhow::Result<Arc<dyn Shortener>> {
    let generator = RandomGenerator::new(config.code_length)?;
    let settings = StoreSettings::builder()
        .max_code_attempts(config.max_code_attempts)
        .build();

    let shortener: Arc<dyn Shortener> = match config.storage {
        StorageBackendArg::InMemory => Arc::new(UrlStore::with_settings(
            InMemoryRepository::new(),
            generator,
            settings,
        )),
        StorageBackendArg::File => {
            let repository = JsonFileRepository::open(&config.data_file)
                .await
                .with_context(|| format!("failed to open {}", config.data_file.display()))?;
            Arc::new(UrlStore::with_settings(repository, generator, settings))
        }
        StorageBackendArg::Sqlite => {
            let database_url = config
                .database_url
                .as_deref()
                .context("database url is required when storage backend is sqlite")?;
            let repository = SqliteRepository::connect(database_url)
                .await
                .context("failed to connect to sqlite")?;
            Arc::new(UrlStore::with_settings(repository, generator, settings))
        }
    };

    Ok(shortener)
}

/// Serves the HTTP API until ctrl-c.
pub async fn run_server(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!(listen_addr = %listener.local_addr()?, "starting snip HTTP server");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("snip HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
