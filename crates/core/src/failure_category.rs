//! Values for the `category` field attached to every failure log line.
//!
//! Keeping them in one place lets log queries group failures without
//! guessing at free-text messages.

pub const VALIDATION: &str = "validation";
pub const INSUFFICIENT_FUNDS: &str = "insufficient_funds";
pub const PROVIDER_SUBMIT: &str = "provider_submit";
pub const PROVIDER_POLL_TRANSIENT: &str = "provider_poll_transient";
pub const PROVIDER_POLL_TERMINAL: &str = "provider_poll_terminal";
pub const TIMEOUT: &str = "timeout";
pub const LEDGER: &str = "ledger";
pub const MIRROR: &str = "mirror";
pub const STORAGE: &str = "storage";
