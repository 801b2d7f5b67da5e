mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use dto::{NewTag, TagUpdate};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::tag_routes())
}
