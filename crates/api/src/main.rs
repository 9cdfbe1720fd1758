use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pixora_pipeline::{ArtifactMirror, Engine, HttpProviderFactory, StorageConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pixora_api=debug,pixora_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pixora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pixora_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    pixora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Object store ---
    let storage = StorageConfig::from_env().expect("Invalid storage configuration");
    let store = storage
        .build()
        .await
        .expect("Failed to initialise object store");
    tracing::info!(public_base_url = %storage.public_base_url, "Object store ready");

    // --- Engine ---
    let http = reqwest::Client::new();
    let engine = Engine::new(
        pool.clone(),
        Arc::new(HttpProviderFactory::new(http.clone())),
        Arc::new(ArtifactMirror::new(store, http)),
    );

    // --- Reconciliation sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = if config.reconcile_interval_secs > 0 {
        Some(tokio::spawn(pixora_pipeline::sweep::run(
            engine.clone(),
            Duration::from_secs(config.reconcile_interval_secs),
            sweep_cancel.clone(),
        )))
    } else {
        tracing::info!("In-process reconciliation sweep disabled");
        None
    };

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    if let Some(handle) = sweep_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Reconciliation sweep stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
