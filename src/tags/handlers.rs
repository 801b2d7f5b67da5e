use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    error::ApiResult,
    extract::{ApiPath, ValidatedChanges, ValidatedJson},
    state::AppState,
};

use super::{
    dto::{NewTag, TagUpdate},
    repo,
};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", post(create_tag).get(list_tags))
        .route(
            "/tags/:handle",
            get(get_tag).patch(update_tag).delete(delete_tag),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewTag>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let tag = repo::create(&state.db, &payload).await?;
    info!(handle = %tag.handle, "tag created");
    Ok((StatusCode::CREATED, Json(json!({ "tag": tag }))))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tags = repo::find_all(&state.db).await?;
    Ok(Json(json!({ "tags": tags })))
}

#[instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    ApiPath(handle): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let tag = repo::get(&state.db, &handle).await?;
    Ok(Json(json!({ "tag": tag })))
}

#[instrument(skip(state, payload))]
pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(handle): ApiPath<String>,
    payload: ValidatedChanges<TagUpdate>,
) -> ApiResult<Json<Value>> {
    let tag = repo::update(&state.db, &handle, &payload.changes).await?;
    Ok(Json(json!({ "tag": tag })))
}

#[instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(handle): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    repo::remove(&state.db, &handle).await?;
    info!(%handle, "tag deleted");
    Ok(Json(json!({ "deleted": handle })))
}
