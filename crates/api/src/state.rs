use std::sync::Arc;

use pixora_pipeline::Engine;

use crate::config::ServerConfig;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: Arc<ServerConfig>,
    /// Generation engine: intake, reconciliation, artifact storage.
    pub engine: Engine,
}
