//! Admin-only ledger operations.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use pixora_core::error::CoreError;
use pixora_core::types::{DbId, Points};
use pixora_db::models::point_transaction::CreditEntry;
use pixora_db::models::status::PointTransactionKind;
use pixora_db::repositories::LedgerRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /admin/users/{id}/points`.
#[derive(Debug, Deserialize)]
pub struct AdminCreditRequest {
    pub amount: Points,
    /// `recharge` or `adjust`.
    pub kind: String,
    /// Payment order id. Required for recharges; a replayed order id is
    /// not credited twice.
    pub order_id: Option<String>,
    pub description: Option<String>,
}

impl AdminCreditRequest {
    fn into_entry(self, user_id: DbId) -> Result<CreditEntry, CoreError> {
        let kind = match self.kind.trim() {
            "recharge" => PointTransactionKind::Recharge,
            "adjust" => PointTransactionKind::Adjust,
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown credit kind '{other}'. Must be one of: recharge, adjust"
                )))
            }
        };

        let order_id = self
            .order_id
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        if kind == PointTransactionKind::Recharge && order_id.is_none() {
            return Err(CoreError::Validation(
                "A recharge requires an order_id".into(),
            ));
        }

        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| match &order_id {
                Some(order) => format!("Recharge for order {order}"),
                None => "Manual adjustment".to_string(),
            });

        Ok(CreditEntry {
            user_id,
            amount: self.amount,
            kind,
            description,
            related_order_id: order_id,
            related_job_id: None,
        })
    }
}

/// POST /api/v1/admin/users/{id}/points
///
/// Credit a user's balance. Returns the ledger entry; replaying a recharge
/// returns the entry created the first time.
pub async fn credit_user_points(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<AdminCreditRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = input.into_entry(user_id).map_err(AppError::Core)?;
    let row = LedgerRepo::credit(&state.pool, &entry).await?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        amount = row.amount,
        kind = %row.kind,
        balance = row.balance_after,
        "Admin credited points",
    );

    Ok(Json(DataResponse { data: row }))
}
