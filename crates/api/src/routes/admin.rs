//! Admin routes. Every handler extracts [`RequireAdmin`].
//!
//! [`RequireAdmin`]: crate::middleware::rbac::RequireAdmin

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST   /users/{id}/points   -> credit_user_points
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/points", post(admin::credit_user_points))
}
