use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i32,
    pub address: String,
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub owner_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub price_per_hour: i32,
    pub min_hours: i32,
}

/// A listing with the descriptions of its tags, e.g. `"Swimming Pool"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingWithTags {
    #[serde(flatten)]
    pub listing: Listing,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ListingTag {
    pub listing_id: i32,
    pub handle: String,
}
