pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    AssemblyOrchestrator, CylinderOperations, JobOperations, ReportOperations, SpecOperations,
};

// Export all model types
pub use model::*;

pub use error::{ServiceError, ServiceResult};

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use anyhow::Context;
use axum::Router;
use crate::config::{AppConfig, StoreBackend};
use std::sync::Arc;

/// Build the application router over the configured store backend.
///
/// The PostgreSQL backend is migrated before the router is returned. Seed data
/// is loaded when `LOAD_SEED_DATA=true`.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let load_seed = std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true";

    match config.database.backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url();
            log::info!("Connecting to PostgreSQL...");
            let postgres_store = PostgresStore::new(&database_url, config.max_connections())
                .await
                .context("Failed to connect to PostgreSQL")?;

            log::info!("Running database migrations...");
            postgres_store.migrate().await?;

            with_store(Arc::new(postgres_store), load_seed).await
        }
        StoreBackend::Memory => {
            log::info!("Using in-memory store");
            with_store(Arc::new(MemoryStore::new()), load_seed).await
        }
    }
}

async fn with_store<S: Store + 'static>(store: Arc<S>, load_seed: bool) -> anyhow::Result<Router> {
    if load_seed {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }
    Ok(routes::create_router().with_state(store))
}

/// Serve the application on the configured address until the process stops.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let app = build_app(config).await?;

    let bind_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    log::info!("Flexo job service running on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
