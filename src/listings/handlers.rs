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
    dto::{ListingSearch, ListingUpdate, NewListing, TagListingRequest},
    repo,
};

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", post(create_listing).get(list_listings))
        .route("/listings/search/:term", get(search_listings))
        .route("/listings/tags", post(tag_listing))
        .route("/listings/tags/:tag", get(listings_by_tag))
        .route(
            "/listings/:id",
            get(get_listing).patch(update_listing).delete(delete_listing),
        )
}

/// POST /listings { listing } => 201 { listing }
#[instrument(skip(state, payload))]
pub async fn create_listing(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<NewListing>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let listing = repo::create(&state.db, &payload).await?;
    info!(listing_id = listing.id, owner_id = listing.owner_id, "listing created");
    Ok((StatusCode::CREATED, Json(json!({ "listing": listing }))))
}

/// GET /listings?title=&city=&state=&zip=&ownerId=&maxPrice= => { listings }
#[instrument(skip(state))]
pub async fn list_listings(
    State(state): State<AppState>,
    ValidatedQuery(search): ValidatedQuery<ListingSearch>,
) -> ApiResult<Json<Value>> {
    let listings = repo::find_all(&state.db, &search).await?;
    Ok(Json(json!({ "listings": listings })))
}

/// GET /listings/search/:term => { listings } whose title contains `term`
#[instrument(skip(state))]
pub async fn search_listings(
    State(state): State<AppState>,
    ApiPath(term): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let listings = repo::search(&state.db, &term).await?;
    Ok(Json(json!({ "listings": listings })))
}

/// GET /listings/tags/:tag => { listings } carrying the tag
#[instrument(skip(state))]
pub async fn listings_by_tag(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let listings = repo::find_by_tag(&state.db, &tag).await?;
    Ok(Json(json!({ "listings": listings })))
}

/// POST /listings/tags { listingId, handle } => 201 { tagged }
#[instrument(skip(state, payload))]
pub async fn tag_listing(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TagListingRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let tagged = repo::add_tag(&state.db, payload.listing_id, &payload.handle).await?;
    info!(listing_id = tagged.listing_id, handle = %tagged.handle, "listing tagged");
    Ok((StatusCode::CREATED, Json(json!({ "tagged": tagged }))))
}

/// GET /listings/:id => { listing }
#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    let listing = repo::get(&state.db, id).await?;
    Ok(Json(json!({ "listing": listing })))
}

/// PATCH /listings/:id { title?, description?, photoUrl?, pricePerHour?, minHours? } => { listing }
#[instrument(skip(state, payload))]
pub async fn update_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    payload: ValidatedChanges<ListingUpdate>,
) -> ApiResult<Json<Value>> {
    let listing = repo::update(&state.db, id, &payload.changes).await?;
    Ok(Json(json!({ "listing": listing })))
}

/// DELETE /listings/:id => { deleted: id }
#[instrument(skip(state))]
pub async fn delete_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    repo::remove(&state.db, id).await?;
    info!(listing_id = id, "listing deleted");
    Ok(Json(json!({ "deleted": id })))
}
