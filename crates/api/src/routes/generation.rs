//! Route definitions for the `/generations` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generations`.
///
/// ```text
/// GET    /        -> list_generations
/// POST   /        -> create_generation
/// GET    /{id}    -> get_generation
/// DELETE /{id}    -> delete_generation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(generation::list_generations).post(generation::create_generation),
        )
        .route(
            "/{id}",
            get(generation::get_generation).delete(generation::delete_generation),
        )
}
