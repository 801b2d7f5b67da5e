mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use dto::{ListingSearch, ListingUpdate, NewListing, TagListingRequest};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::listing_routes())
}
