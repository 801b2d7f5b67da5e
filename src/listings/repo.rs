use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::debug;

use crate::{
    error::{is_foreign_key_violation, is_unique_violation, ApiError, ApiResult},
    sql::{Column, ColumnMap, PartialUpdate, WhereClause},
};

use super::{
    dto::{ListingSearch, NewListing},
    repo_types::{Listing, ListingTag, ListingWithTags},
};

const LISTING_COLUMNS: &str = "id, address, unit, city, state, zip, country, owner_id, \
     title, description, photo_url, price_per_hour, min_hours";

/// Fields a PATCH /listings/:id body may carry.
pub const LISTING_UPDATE_COLUMNS: ColumnMap = ColumnMap::new(&[
    ("title", Column::text("title")),
    ("description", Column::text("description").nullable()),
    ("photoUrl", Column::text("photo_url").nullable()),
    ("pricePerHour", Column::int("price_per_hour")),
    ("minHours", Column::int("min_hours")),
]);

fn no_listing(id: i32) -> ApiError {
    ApiError::NotFound(format!("No listing: {id}"))
}

fn no_tag(handle: &str) -> ApiError {
    ApiError::NotFound(format!("No tag: {handle}"))
}

/// Insert a listing. The address is unique; the owner must exist.
pub async fn create(db: &PgPool, new: &NewListing) -> ApiResult<Listing> {
    let sql = format!(
        "INSERT INTO listings (address, unit, city, state, zip, country, owner_id, \
                               title, description, photo_url, price_per_hour, min_hours) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {LISTING_COLUMNS}"
    );
    let listing = sqlx::query_as::<_, Listing>(&sql)
        .bind(&new.address)
        .bind(&new.unit)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.zip)
        .bind(&new.country)
        .bind(new.owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.photo_url)
        .bind(new.price_per_hour)
        .bind(new.min_hours)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::BadRequest(format!("Duplicate listing: {}", new.address))
            } else if is_foreign_key_violation(&e) {
                ApiError::NotFound(format!("No user: {}", new.owner_id))
            } else {
                e.into()
            }
        })?;
    Ok(listing)
}

/// Listings matching every supplied filter, ordered by zip code.
pub async fn find_all(db: &PgPool, search: &ListingSearch) -> ApiResult<Vec<ListingWithTags>> {
    let filter = WhereClause::new()
        .ilike("title", search.title.as_deref())
        .ilike("city", search.city.as_deref())
        .eq("state", search.state.as_deref())
        .eq("zip", search.zip.as_deref())
        .eq("owner_id", search.owner_id)
        .at_most("price_per_hour", search.max_price);
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings {} ORDER BY zip, id",
        filter.sql()
    );
    debug!(%sql, "find listings");

    let listings = filter
        .bind(sqlx::query_as::<_, Listing>(&sql))
        .fetch_all(db)
        .await?;
    attach_tags(db, listings).await
}

/// Case-insensitive title search.
pub async fn search(db: &PgPool, term: &str) -> ApiResult<Vec<ListingWithTags>> {
    let search = ListingSearch {
        title: Some(term.to_owned()),
        ..ListingSearch::default()
    };
    find_all(db, &search).await
}

/// Listings tagged with `handle`. An unknown handle is `NotFound`; a known
/// handle nobody uses yields an empty list.
pub async fn find_by_tag(db: &PgPool, handle: &str) -> ApiResult<Vec<ListingWithTags>> {
    sqlx::query_scalar::<_, String>("SELECT handle FROM tags WHERE handle = $1")
        .bind(handle)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_tag(handle))?;

    let listings = sqlx::query_as::<_, Listing>(
        r#"
        SELECT l.id, l.address, l.unit, l.city, l.state, l.zip, l.country, l.owner_id,
               l.title, l.description, l.photo_url, l.price_per_hour, l.min_hours
        FROM listings AS l
        JOIN listing_tags AS lt ON lt.listing_id = l.id
        WHERE lt.handle = $1
        ORDER BY l.zip, l.id
        "#,
    )
    .bind(handle)
    .fetch_all(db)
    .await?;
    attach_tags(db, listings).await
}

pub async fn get(db: &PgPool, id: i32) -> ApiResult<ListingWithTags> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
    let listing = sqlx::query_as::<_, Listing>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_listing(id))?;

    attach_tags(db, vec![listing])
        .await?
        .pop()
        .ok_or_else(|| no_listing(id))
}

/// Partial update; only the fields present in `changes` are written.
pub async fn update(db: &PgPool, id: i32, changes: &Map<String, Value>) -> ApiResult<Listing> {
    let update = PartialUpdate::build(changes, &LISTING_UPDATE_COLUMNS)?;
    let sql = format!(
        "UPDATE listings SET {} WHERE id = {} RETURNING {LISTING_COLUMNS}",
        update.set_clause(),
        update.next_placeholder(),
    );
    debug!(%sql, "update listing");

    update
        .bind(sqlx::query_as::<_, Listing>(&sql))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_listing(id))
}

pub async fn remove(db: &PgPool, id: i32) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM listings WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(no_listing(id));
    }
    Ok(())
}

/// Associate a tag with a listing. Both must exist; tagging twice is a
/// `BadRequest`.
pub async fn add_tag(db: &PgPool, listing_id: i32, handle: &str) -> ApiResult<ListingTag> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_listing(listing_id))?;

    sqlx::query_scalar::<_, String>("SELECT handle FROM tags WHERE handle = $1")
        .bind(handle)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_tag(handle))?;

    let tagged = sqlx::query_as::<_, ListingTag>(
        r#"
        INSERT INTO listing_tags (listing_id, handle)
        VALUES ($1, $2)
        RETURNING listing_id, handle
        "#,
    )
    .bind(listing_id)
    .bind(handle)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::BadRequest(format!("Listing {listing_id} is already tagged {handle}"))
        } else if is_foreign_key_violation(&e) {
            no_listing(listing_id)
        } else {
            e.into()
        }
    })?;
    Ok(tagged)
}

/// Loads the tag descriptions of all `listings` in one query.
async fn attach_tags(db: &PgPool, listings: Vec<Listing>) -> ApiResult<Vec<ListingWithTags>> {
    if listings.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = listings.iter().map(|l| l.id).collect();
    let rows = sqlx::query_as::<_, (i32, String)>(
        r#"
        SELECT lt.listing_id, t.description
        FROM listing_tags AS lt
        JOIN tags AS t ON t.handle = lt.handle
        WHERE lt.listing_id = ANY($1)
        ORDER BY t.description
        "#,
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    Ok(group_tags(listings, rows))
}

fn group_tags(listings: Vec<Listing>, rows: Vec<(i32, String)>) -> Vec<ListingWithTags> {
    let mut by_listing: HashMap<i32, Vec<String>> = HashMap::new();
    for (listing_id, description) in rows {
        by_listing.entry(listing_id).or_default().push(description);
    }
    listings
        .into_iter()
        .map(|listing| {
            let tags = by_listing.remove(&listing.id).unwrap_or_default();
            ListingWithTags { listing, tags }
        })
        .collect()
}
