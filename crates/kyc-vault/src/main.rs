//! `kyc-vault`: service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP export).
//! 3. Build the field cipher from the configured key.
//! 4. Connect the configured document store.
//! 5. Build the extraction client.
//! 6. Build the Axum router and serve until Ctrl-C.

mod config;
mod crypto;
mod customer;
mod entity;
mod extraction;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::{Config, StoreBackend};
use crypto::FieldCipher;
use customer::CustomerService;
use extraction::HttpExtractor;
use server::{middleware::ServerSettings, state::AppState};
use store::{DocumentStore, MemoryStore, MongoStore};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "kyc-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field cipher
    // -----------------------------------------------------------------------
    let cipher = FieldCipher::new(cfg.encryption_key()?);

    // -----------------------------------------------------------------------
    // 4. Document store
    // -----------------------------------------------------------------------
    let store: Arc<dyn DocumentStore> = match cfg.store_backend()? {
        StoreBackend::MongoDb => {
            let uri = cfg.mongodb_uri.as_deref().unwrap_or_default();
            let mongo = MongoStore::connect(uri, &cfg.database_name, &cfg.collection_name)
                .await
                .context("failed to configure MongoDB client")?;
            Arc::new(mongo)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(store_backend = store.backend(), "document store ready");

    // -----------------------------------------------------------------------
    // 5. Extraction client
    // -----------------------------------------------------------------------
    let extractor = HttpExtractor::new(&cfg.extraction_service_url)
        .context("failed to build extraction client")?;

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(CustomerService::new(store, cipher), Arc::new(extractor));
    let settings = ServerSettings {
        request_timeout: cfg.request_timeout(),
        max_body_bytes: cfg.max_upload_bytes,
    };
    let router = server::router::build(state, settings);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("kyc-vault stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
