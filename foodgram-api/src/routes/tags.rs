/// Tag endpoints (read-only)
///
/// - `GET /api/tags/`
/// - `GET /api/tags/{id}/`

use axum::{extract::State, Json};
use foodgram_shared::models::tag::Tag;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiPath,
};

/// All tags, ordered by name
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(Tag::list(&state.db).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Tag>> {
    let tag = Tag::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    Ok(Json(tag))
}
