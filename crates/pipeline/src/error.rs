use pixora_core::error::CoreError;
use pixora_db::error::LedgerError;
use pixora_providers::ProviderError;

use crate::storage::StorageError;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        match err.into_core() {
            Ok(core) => PipelineError::Core(core),
            Err(db) => PipelineError::Database(db),
        }
    }
}
