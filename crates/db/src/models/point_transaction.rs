//! Point ledger entries.

use pixora_core::types::{DbId, Points, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{PointTransactionKind, StatusId};

/// A row from the `point_transactions` table, with the kind name joined in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PointTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub kind_id: StatusId,
    pub kind: String,
    /// Signed: negative for consume, positive otherwise.
    pub amount: Points,
    pub balance_after: Points,
    pub description: String,
    pub related_job_id: Option<DbId>,
    pub related_order_id: Option<String>,
    pub created_at: Timestamp,
}

/// Input for a positive ledger mutation.
#[derive(Debug, Clone)]
pub struct CreditEntry {
    pub user_id: DbId,
    pub amount: Points,
    pub kind: PointTransactionKind,
    pub description: String,
    pub related_order_id: Option<String>,
    pub related_job_id: Option<DbId>,
}

impl CreditEntry {
    /// Refund of a failed job's full cost.
    pub fn refund(user_id: DbId, job_id: DbId, amount: Points) -> Self {
        Self {
            user_id,
            amount,
            kind: PointTransactionKind::Refund,
            description: format!("Refund for failed generation #{job_id}"),
            related_order_id: None,
            related_job_id: Some(job_id),
        }
    }
}
