//! Builds the active provider from a settings snapshot.

use std::sync::Arc;

use pixora_providers::{ImageProvider, ProviderAdapter, ProviderError, ProviderSettings};

/// Source of [`ImageProvider`]s for the engine.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn ImageProvider>, ProviderError>;
}

/// Builds real HTTP adapters, sharing one connection pool.
#[derive(Clone, Default)]
pub struct HttpProviderFactory {
    client: reqwest::Client,
}

impl HttpProviderFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn ImageProvider>, ProviderError> {
        let adapter = ProviderAdapter::from_settings(self.client.clone(), settings)?;
        Ok(Arc::new(adapter))
    }
}
