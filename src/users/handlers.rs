use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    auth::jwt::JwtKeys,
    error::ApiResult,
    extract::{ApiPath, ValidatedChanges, ValidatedJson},
    state::AppState,
};

use super::{
    dto::{NewBooking, NewUser, UserUpdate},
    repo,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/:id/book", post(book_listing))
        .route("/users/:id/book/", post(book_listing))
}

/// POST /users { user } => { user, token }
///
/// Admin-side creation; the new user may itself be an admin.
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(mut payload): ValidatedJson<NewUser>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    payload.email = payload.email.trim().to_lowercase();

    let user = repo::register(&state.db, &payload).await?;
    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// GET /users => { users: [...] }
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = repo::find_all(&state.db).await?;
    Ok(Json(json!({ "users": users })))
}

/// GET /users/:id => { user } with `listings` and `bookings` attached
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    let user = repo::get(&state.db, id).await?;
    Ok(Json(json!({ "user": user })))
}

/// PATCH /users/:id { firstName?, lastName?, email?, password?, bio? } => { user }
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    payload: ValidatedChanges<UserUpdate>,
) -> ApiResult<Json<Value>> {
    let mut changes = payload.changes;
    if let Some(Value::String(email)) = changes.get_mut("email") {
        *email = email.trim().to_lowercase();
    }
    let user = repo::update(&state.db, id, changes).await?;
    Ok(Json(json!({ "user": user })))
}

/// DELETE /users/:id => { deleted: id }
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    repo::remove(&state.db, id).await?;
    info!(user_id = id, "user deleted");
    Ok(Json(json!({ "deleted": id })))
}

/// POST /users/:id/book { listingId, startDate, startHour, numHours } => { booking }
#[instrument(skip(state, payload))]
pub async fn book_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<NewBooking>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let booking = repo::book_listing(&state.db, id, &payload).await?;
    info!(
        booking_id = booking.id,
        listing_id = booking.listing_id,
        renter_id = id,
        "listing booked"
    );
    Ok((StatusCode::CREATED, Json(json!({ "booking": booking }))))
}
