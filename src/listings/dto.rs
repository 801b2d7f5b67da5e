use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewListing {
    #[validate(length(min = 1, max = 200))]
    pub address: String,
    #[validate(length(max = 20))]
    pub unit: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 50))]
    pub state: String,
    #[validate(length(min = 1, max = 12))]
    pub zip: String,
    #[validate(length(min = 1, max = 60))]
    pub country: String,
    #[validate(range(min = 1))]
    pub owner_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    #[validate(range(min = 0))]
    pub price_per_hour: i32,
    #[validate(range(min = 1))]
    pub min_hours: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListingUpdate {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    #[validate(range(min = 0))]
    pub price_per_hour: Option<i32>,
    #[validate(range(min = 1))]
    pub min_hours: Option<i32>,
}

/// GET /listings query filters, all optional.
///
/// `title` and `city` match case-insensitively anywhere in the value;
/// `maxPrice` bounds the hourly price.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListingSearch {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[validate(range(min = 1))]
    pub owner_id: Option<i32>,
    #[validate(range(min = 0))]
    pub max_price: Option<i32>,
}

/// POST /listings/tags body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagListingRequest {
    #[validate(range(min = 1))]
    pub listing_id: i32,
    #[validate(length(min = 1, max = 25))]
    pub handle: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_listing_requires_address() {
        let res = serde_json::from_value::<NewListing>(json!({
            "city": "Los Angeles",
            "state": "CA",
            "zip": "90027",
            "country": "USA",
            "ownerId": 1,
            "title": "GIANT HOUSE ON THE HILL",
            "pricePerHour": 200,
            "minHours": 6,
        }));
        assert!(res.unwrap_err().to_string().contains("address"));
    }

    #[test]
    fn new_listing_rejects_negative_price() {
        let listing: NewListing = serde_json::from_value(json!({
            "address": "200 stinker ave",
            "city": "Los Angeles",
            "state": "CA",
            "zip": "90027",
            "country": "USA",
            "ownerId": 1,
            "title": "house",
            "pricePerHour": -5,
            "minHours": 1,
        }))
        .unwrap();
        assert!(listing.validate().unwrap_err().field_errors().contains_key("price_per_hour"));
    }

    #[test]
    fn update_rejects_fields_outside_the_column_map() {
        let res = serde_json::from_value::<ListingUpdate>(json!({ "ownerId": 2 }));
        assert!(res.is_err());
    }
}
