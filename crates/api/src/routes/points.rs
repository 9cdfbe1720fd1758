use axum::routing::get;
use axum::Router;

use crate::handlers::points;
use crate::state::AppState;

/// Routes mounted at `/points`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(points::get_points))
}
