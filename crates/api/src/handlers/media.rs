//! Serves mirrored artifacts out of the object store.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use pixora_pipeline::storage::content_type_for_key;
use pixora_pipeline::PipelineError;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/media/{*key}
///
/// Public: stored keys embed the job id and a timestamp, and the URLs are
/// handed out as permanent image links.
pub async fn get_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let object = state
        .engine
        .mirror()
        .store()
        .get(&key)
        .await
        .map_err(PipelineError::from)?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| content_type_for_key(&key).to_string());

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        object.body,
    ))
}
