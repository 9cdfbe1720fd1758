pub mod admin;
pub mod generation;
pub mod health;
pub mod media;
pub mod points;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                         list, create
/// /generations/{id}                    status (reconciles), delete
///
/// /points                              balance and history
///
/// /admin/users/{id}/points             credit (admin only)
///
/// /media/{*key}                        stored artifacts (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generations", generation::router())
        .nest("/points", points::router())
        .nest("/admin", admin::router())
        .nest("/media", media::router())
}
