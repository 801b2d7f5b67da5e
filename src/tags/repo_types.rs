use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An amenity keyed by a short handle, e.g. `pool` / `Swimming Pool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub handle: String,
    pub description: String,
}
