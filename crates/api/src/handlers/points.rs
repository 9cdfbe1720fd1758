//! Handlers for the caller's point balance and history.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use pixora_core::types::Points;
use pixora_db::models::point_transaction::PointTransaction;
use pixora_db::repositories::LedgerRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of transactions returned.
const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Pagination for the transaction history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PointsSummary {
    pub balance: Points,
    /// Newest first.
    pub transactions: Vec<PointTransaction>,
}

/// GET /api/v1/points
pub async fn get_points(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let balance = LedgerRepo::balance(&state.pool, auth.user_id).await?;
    let transactions = LedgerRepo::list_transactions(
        &state.pool,
        auth.user_id,
        params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        params.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(DataResponse {
        data: PointsSummary {
            balance,
            transactions,
        },
    }))
}
