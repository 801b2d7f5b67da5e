use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::listings::repo_types::Listing;

/// Public user record; the password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: Option<String>,
    pub is_admin: bool,
}

/// Row read only by authentication.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i32,
    pub listing_id: i32,
    pub renter_id: i32,
    #[serde(with = "crate::dates")]
    pub start_date: Date,
    pub start_hour: i32,
    pub num_hours: i32,
    pub total_price: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub booked_at: OffsetDateTime,
}

/// A user with the listings they own and the bookings they made.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub listings: Vec<Listing>,
    pub bookings: Vec<Booking>,
}
