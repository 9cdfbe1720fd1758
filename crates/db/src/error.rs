use pixora_core::error::CoreError;
use pixora_core::types::{DbId, Points};

/// Failures of a ledger mutation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("user {0} not found")]
    UserNotFound(DbId),

    #[error("insufficient points: {required} required, {available} available")]
    InsufficientFunds { required: Points, available: Points },

    #[error("ledger amounts must be positive, got {0}")]
    InvalidAmount(Points),

    #[error("order {0} was already credited to another user")]
    OrderConflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Convert the domain variants into [`CoreError`]. Database errors are
    /// returned unchanged so callers can keep their own classification.
    pub fn into_core(self) -> Result<CoreError, sqlx::Error> {
        match self {
            LedgerError::UserNotFound(id) => Ok(CoreError::NotFound { entity: "User", id }),
            LedgerError::InsufficientFunds { required, available } => {
                Ok(CoreError::InsufficientFunds { required, available })
            }
            LedgerError::InvalidAmount(amount) => Ok(CoreError::Validation(format!(
                "Amount must be positive, got {amount}"
            ))),
            LedgerError::OrderConflict(order_id) => Ok(CoreError::Conflict(format!(
                "Order {order_id} was already credited to another user"
            ))),
            LedgerError::Database(e) => Err(e),
        }
    }
}
