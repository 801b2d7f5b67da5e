use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::{
    auth::password::{hash_password, invalid_credentials, verify_password},
    error::{
        is_foreign_key_violation, is_unique_violation, violated_constraint, ApiError, ApiResult,
    },
    listings::repo_types::Listing,
    sql::{Column, ColumnMap, PartialUpdate},
    users::{
        dto::{NewBooking, NewUser},
        repo_types::{Booking, User, UserCredentials, UserDetails},
    },
};

/// Fields a PATCH /users/:id body may carry. `password` is hashed before
/// the update is built.
pub const USER_COLUMNS: ColumnMap = ColumnMap::new(&[
    ("firstName", Column::text("first_name")),
    ("lastName", Column::text("last_name")),
    ("email", Column::text("email")),
    ("password", Column::text("password_hash")),
    ("bio", Column::text("bio").nullable()),
]);

fn no_user(id: i32) -> ApiError {
    ApiError::NotFound(format!("No user: {id}"))
}

/// Create a user with a hashed password. Fails with `BadRequest` when the
/// email is already registered.
pub async fn register(db: &PgPool, new: &NewUser) -> ApiResult<User> {
    let hash = hash_password(&new.password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, bio, is_admin)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, first_name, last_name, email, bio, is_admin
        "#,
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(&hash)
    .bind(&new.bio)
    .bind(new.is_admin)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::BadRequest(format!("Duplicate email: {}", new.email))
        } else {
            e.into()
        }
    })?;
    Ok(user)
}

/// Check an email/password pair. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> ApiResult<User> {
    let row = sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, first_name, last_name, email, bio, is_admin, password_hash
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        warn!(%email, "authentication failed: unknown email");
        return Err(invalid_credentials());
    };
    if let Err(e) = verify_password(password, &row.password_hash) {
        warn!(user_id = row.user.id, "authentication failed");
        return Err(e);
    }
    Ok(row.user)
}

pub async fn find_all(db: &PgPool) -> ApiResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, bio, is_admin
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(users)
}

/// A user with owned listings and bookings; the two lookups run concurrently.
pub async fn get(db: &PgPool, id: i32) -> ApiResult<UserDetails> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, bio, is_admin
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| no_user(id))?;

    let listings = sqlx::query_as::<_, Listing>(
        r#"
        SELECT id, address, unit, city, state, zip, country, owner_id,
               title, description, photo_url, price_per_hour, min_hours
        FROM listings
        WHERE owner_id = $1
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(db);

    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT id, listing_id, renter_id, start_date, start_hour, num_hours,
               total_price, booked_at
        FROM bookings
        WHERE renter_id = $1
        ORDER BY start_date, start_hour, id
        "#,
    )
    .bind(id)
    .fetch_all(db);

    let (listings, bookings) = tokio::try_join!(listings, bookings)?;
    Ok(UserDetails {
        user,
        listings,
        bookings,
    })
}

/// Partial update; only the fields present in `changes` are written.
pub async fn update(db: &PgPool, id: i32, mut changes: Map<String, Value>) -> ApiResult<User> {
    if let Some(Value::String(plain)) = changes.get_mut("password") {
        *plain = hash_password(plain)?;
    }

    let update = PartialUpdate::build(&changes, &USER_COLUMNS)?;
    let sql = format!(
        "UPDATE users SET {} WHERE id = {} \
         RETURNING id, first_name, last_name, email, bio, is_admin",
        update.set_clause(),
        update.next_placeholder(),
    );
    debug!(%sql, "update user");

    let user = update
        .bind(sqlx::query_as::<_, User>(&sql))
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::BadRequest("Duplicate email".into())
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| no_user(id))?;
    Ok(user)
}

pub async fn remove(db: &PgPool, id: i32) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(no_user(id));
    }
    Ok(())
}

/// Book a listing for a user. The listing and the user must exist and the
/// booking must meet the listing's minimum hours; the total is computed
/// from the listing's hourly price.
pub async fn book_listing(db: &PgPool, user_id: i32, booking: &NewBooking) -> ApiResult<Booking> {
    let (price_per_hour, min_hours) = sqlx::query_as::<_, (i32, i32)>(
        "SELECT price_per_hour, min_hours FROM listings WHERE id = $1",
    )
    .bind(booking.listing_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("No listing: {}", booking.listing_id)))?;

    sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_user(user_id))?;

    if booking.num_hours < min_hours {
        return Err(ApiError::BadRequest(format!(
            "Listing {} must be booked for at least {} hours",
            booking.listing_id, min_hours
        )));
    }
    let total_price = price_per_hour
        .checked_mul(booking.num_hours)
        .ok_or_else(|| ApiError::BadRequest("Booking total is out of range".into()))?;

    let created = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (listing_id, renter_id, start_date, start_hour, num_hours, total_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, listing_id, renter_id, start_date, start_hour, num_hours,
                  total_price, booked_at
        "#,
    )
    .bind(booking.listing_id)
    .bind(user_id)
    .bind(booking.start_date)
    .bind(booking.start_hour)
    .bind(booking.num_hours)
    .bind(total_price)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            missing_booking_reference(violated_constraint(&e), user_id, booking.listing_id)
        } else {
            e.into()
        }
    })?;
    Ok(created)
}

/// Names the row a booking insert could not reference, by the foreign key
/// that fired.
fn missing_booking_reference(constraint: Option<&str>, user_id: i32, listing_id: i32) -> ApiError {
    match constraint {
        Some("bookings_renter_id_fkey") => no_user(user_id),
        Some("bookings_listing_id_fkey") => ApiError::NotFound(format!("No listing: {listing_id}")),
        _ => ApiError::NotFound(format!("No listing {listing_id} or user {user_id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_foreign_keys_name_the_missing_row() {
        let err = missing_booking_reference(Some("bookings_renter_id_fkey"), 3, 8);
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "No user: 3"));

        let err = missing_booking_reference(Some("bookings_listing_id_fkey"), 3, 8);
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "No listing: 8"));

        let err = missing_booking_reference(None, 3, 8);
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "No listing 8 or user 3"));
    }

    #[test]
    fn password_field_maps_to_the_hash_column() {
        assert_eq!(USER_COLUMNS.column("password").map(|c| c.name), Some("password_hash"));
        assert!(USER_COLUMNS.column("isAdmin").is_none());
    }
}
