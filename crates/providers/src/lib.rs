//! Provider Adapter: one interface over the upstream image APIs.
//!
//! Three wire shapes are supported, each a variant of [`ProviderAdapter`]:
//!
//! - [`SyncImageClient`]: one call, images in the response.
//! - [`ChatImageClient`]: a chat completion whose reply carries the image.
//! - [`SubmitPollClient`]: submit returns a task id that is polled later.
//!
//! Callers only see [`ImageProvider::dispatch`] and [`ImageProvider::poll`].

pub mod adapter;
pub mod chat_image;
pub mod error;
mod http;
pub mod submit_poll;
pub mod sync_image;
pub mod types;

pub use adapter::{ProviderAdapter, ProviderProtocol, ProviderSettings};
pub use chat_image::ChatImageClient;
pub use error::ProviderError;
pub use submit_poll::{SubmitFlavor, SubmitPollClient};
pub use sync_image::SyncImageClient;
pub use types::{DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome, TaskStatus};
