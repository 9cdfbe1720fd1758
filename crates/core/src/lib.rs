//! Pure domain logic for the image generation and points engine.
//!
//! Nothing in this crate performs I/O. Database access lives in
//! `pixora-db`, provider HTTP calls in `pixora-providers`.

pub mod error;
pub mod failure_category;
pub mod generation;
pub mod pricing;
pub mod roles;
pub mod settings;
pub mod types;
