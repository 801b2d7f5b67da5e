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
    extract::{ApiPath, ValidatedChanges, ValidatedJson, ValidatedQuery},
    state::AppState,
};

use super::{
    dto::{MessageSearch, MessageUpdate, NewMessage},
    repo,
};

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(create_message).get(list_messages))
        .route(
            "/messages/:id",
            get(get_message).patch(update_message).delete(delete_message),
        )
}

/// POST /messages { listingId, fromUserId, toUserId, message } => 201 { message }
#[instrument(skip(state, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewMessage>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let message = repo::create(&state.db, &payload).await?;
    info!(
        message_id = message.id,
        listing_id = message.listing_id,
        "message sent"
    );
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

/// GET /messages?listingId=&fromUserId=&toUserId= => { messages }
#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    ValidatedQuery(search): ValidatedQuery<MessageSearch>,
) -> ApiResult<Json<Value>> {
    let messages = repo::find_all(&state.db, &search).await?;
    Ok(Json(json!({ "messages": messages })))
}

#[instrument(skip(state))]
pub async fn get_message(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    let message = repo::get(&state.db, id).await?;
    Ok(Json(json!({ "message": message })))
}

#[instrument(skip(state, payload))]
pub async fn update_message(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    payload: ValidatedChanges<MessageUpdate>,
) -> ApiResult<Json<Value>> {
    let message = repo::update(&state.db, id, &payload.changes).await?;
    Ok(Json(json!({ "message": message })))
}

#[instrument(skip(state))]
pub async fn delete_message(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    repo::remove(&state.db, id).await?;
    info!(message_id = id, "message deleted");
    Ok(Json(json!({ "deleted": id })))
}
