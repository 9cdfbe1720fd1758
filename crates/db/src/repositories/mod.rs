//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a `&mut PgConnection` for writes that must share
//! a transaction) as the first argument.

pub mod generation_job_repo;
pub mod ledger_repo;
pub mod setting_repo;
pub mod user_repo;

pub use generation_job_repo::GenerationJobRepo;
pub use ledger_repo::LedgerRepo;
pub use setting_repo::SettingRepo;
pub use user_repo::UserRepo;
