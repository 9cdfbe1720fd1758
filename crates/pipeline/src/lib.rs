//! The generation engine.
//!
//! [`Engine`] ties the pieces together:
//!
//! - [`dispatcher`]: price, debit and persist a batch, then hand each job
//!   to the provider in the background.
//! - [`reconciler`]: turn provider task state into job state, including
//!   the timeout policy.
//! - [`mirror`]: copy provider-hosted images into the object store.
//! - [`sweep`]: periodic reconciliation of every pending job.
//!
//! Terminal transitions (complete, or fail and refund) live in one place
//! and are shared by the background dispatch and the reconciler.

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod provider_factory;
pub mod reconciler;
pub mod settings;
pub mod storage;
pub mod sweep;
mod terminal;

pub use dispatcher::CreatedBatch;
pub use engine::Engine;
pub use error::PipelineError;
pub use mirror::ArtifactMirror;
pub use provider_factory::{HttpProviderFactory, ProviderFactory};
pub use reconciler::JobState;
pub use settings::LiveSettings;
pub use storage::{ObjectStore, StorageConfig, StorageError, StoredObject};
