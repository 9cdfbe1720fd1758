//! Standalone reconciliation worker.
//!
//! Runs the periodic sweep outside the API process, for deployments that
//! set `RECONCILE_INTERVAL_SECS=0` on the API.

use std::sync::Arc;
use std::time::Duration;

use pixora_pipeline::{ArtifactMirror, Engine, HttpProviderFactory, StorageConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixora_worker=debug,pixora_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let interval_secs: u64 = std::env::var("RECONCILE_INTERVAL_SECS")
        .unwrap_or_else(|_| "15".into())
        .parse()
        .expect("RECONCILE_INTERVAL_SECS must be a valid u64");
    assert!(interval_secs > 0, "RECONCILE_INTERVAL_SECS must be positive for the worker");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = pixora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    pixora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let store = StorageConfig::from_env()
        .expect("Invalid storage configuration")
        .build()
        .await
        .expect("Failed to initialise object store");

    let http = reqwest::Client::new();
    let engine = Engine::new(
        pool,
        Arc::new(HttpProviderFactory::new(http.clone())),
        Arc::new(ArtifactMirror::new(store, http)),
    );

    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(pixora_pipeline::sweep::run(
        engine,
        Duration::from_secs(interval_secs),
        cancel.clone(),
    ));
    tracing::info!(interval_secs, "Worker started");

    shutdown_signal().await;
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(10), sweep).await;
    tracing::info!("Worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
