//! Repository behaviour against a real Postgres. Run with a `DATABASE_URL`
//! pointing at a server that allows creating databases:
//! `cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Map, Value};
use sharebb::{
    app::build_app,
    error::ApiError,
    listings::{self, ListingSearch, NewListing},
    messages::{self, MessageSearch, NewMessage},
    state::AppState,
    tags::{self, NewTag},
    users::{self, NewBooking, NewUser},
};
use sqlx::PgPool;
use time::macros::date;
use tower::ServiceExt;

fn new_user(email: &str) -> NewUser {
    serde_json::from_value(json!({
        "firstName": "test",
        "lastName": "jest",
        "email": email,
        "password": "password123",
    }))
    .unwrap()
}

fn new_listing(owner_id: i32, address: &str) -> NewListing {
    serde_json::from_value(json!({
        "address": address,
        "city": "Los Angeles",
        "state": "CA",
        "zip": "90027",
        "country": "USA",
        "ownerId": owner_id,
        "title": "GIANT HOUSE ON THE HILL",
        "pricePerHour": 200,
        "minHours": 2,
    }))
    .unwrap()
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn user_round_trip_and_duplicate_email(pool: PgPool) {
    let created = users::repo::register(&pool, &new_user("test@test.com")).await.unwrap();
    let fetched = users::repo::get(&pool, created.id).await.unwrap();
    assert_eq!(fetched.user, created);
    assert!(fetched.listings.is_empty());

    let err = users::repo::register(&pool, &new_user("test@test.com")).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("Duplicate email")));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn authenticate_checks_the_password(pool: PgPool) {
    users::repo::register(&pool, &new_user("login@test.com")).await.unwrap();
    let user = users::repo::authenticate(&pool, "login@test.com", "password123").await.unwrap();
    assert_eq!(user.email, "login@test.com");

    let err = users::repo::authenticate(&pool, "login@test.com", "wrong-pass").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    let err = users::repo::authenticate(&pool, "nobody@test.com", "password123").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn partial_update_leaves_absent_fields_alone(pool: PgPool) {
    let user = users::repo::register(&pool, &new_user("patch@test.com")).await.unwrap();
    let updated = users::repo::update(&pool, user.id, object(json!({ "bio": "hello", "lastName": "new" })))
        .await
        .unwrap();
    assert_eq!(updated.first_name, "test");
    assert_eq!(updated.last_name, "new");
    assert_eq!(updated.bio.as_deref(), Some("hello"));

    let cleared = users::repo::update(&pool, user.id, object(json!({ "bio": null })))
        .await
        .unwrap();
    assert_eq!(cleared.bio, None);

    let rehashed = users::repo::update(&pool, user.id, object(json!({ "password": "another-secret" })))
        .await
        .unwrap();
    assert_eq!(rehashed.id, user.id);
    users::repo::authenticate(&pool, "patch@test.com", "another-secret").await.unwrap();
}

fn not_found<T: std::fmt::Debug>(res: Result<T, ApiError>) -> bool {
    matches!(res, Err(ApiError::NotFound(_)))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn missing_rows_are_not_found(pool: PgPool) {
    assert!(not_found(users::repo::get(&pool, 999).await));
    assert!(not_found(
        users::repo::update(&pool, 999, object(json!({ "firstName": "x" }))).await
    ));
    assert!(not_found(users::repo::remove(&pool, 999).await));

    assert!(not_found(listings::repo::get(&pool, 999).await));
    assert!(not_found(
        listings::repo::update(&pool, 999, &object(json!({ "title": "x" }))).await
    ));
    assert!(not_found(listings::repo::remove(&pool, 999).await));
    assert!(not_found(listings::repo::find_by_tag(&pool, "nope").await));
    assert!(not_found(listings::repo::add_tag(&pool, 999, "pool").await));

    assert!(not_found(tags::repo::get(&pool, "nope").await));
    assert!(not_found(
        tags::repo::update(&pool, "nope", &object(json!({ "description": "x" }))).await
    ));
    assert!(not_found(tags::repo::remove(&pool, "nope").await));

    assert!(not_found(messages::repo::get(&pool, 999).await));
    assert!(not_found(
        messages::repo::update(&pool, 999, &object(json!({ "message": "x" }))).await
    ));
    assert!(not_found(messages::repo::remove(&pool, 999).await));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn created_rows_read_back_unchanged(pool: PgPool) {
    let owner = users::repo::register(&pool, &new_user("rt-owner@test.com")).await.unwrap();
    let guest = users::repo::register(&pool, &new_user("rt-guest@test.com")).await.unwrap();

    let listing = listings::repo::create(&pool, &new_listing(owner.id, "12 echo st"))
        .await
        .unwrap();
    let fetched = listings::repo::get(&pool, listing.id).await.unwrap();
    assert_eq!(fetched.listing, listing);
    assert!(fetched.tags.is_empty());

    let tag = tags::repo::create(
        &pool,
        &NewTag {
            handle: "hammock".into(),
            description: "Hammock".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(tags::repo::get(&pool, "hammock").await.unwrap(), tag);

    let message = messages::repo::create(
        &pool,
        &NewMessage {
            listing_id: listing.id,
            from_user_id: guest.id,
            to_user_id: owner.id,
            message: "free on saturday?".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(messages::repo::get(&pool, message.id).await.unwrap(), message);
    assert_eq!(message.from_user_id, guest.id);
    assert_eq!(message.message, "free on saturday?");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn listings_filter_and_carry_tags(pool: PgPool) {
    let owner = users::repo::register(&pool, &new_user("owner@test.com")).await.unwrap();
    let house = listings::repo::create(&pool, &new_listing(owner.id, "200 stinker ave"))
        .await
        .unwrap();
    listings::repo::create(&pool, &new_listing(owner.id, "1 other st")).await.unwrap();

    let err = listings::repo::create(&pool, &new_listing(owner.id, "200 stinker ave"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("Duplicate listing")));

    let err = listings::repo::create(&pool, &new_listing(999, "3 ghost rd")).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    listings::repo::add_tag(&pool, house.id, "pool").await.unwrap();
    let err = listings::repo::add_tag(&pool, house.id, "pool").await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let tagged = listings::repo::find_by_tag(&pool, "pool").await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].listing.id, house.id);
    assert_eq!(tagged[0].tags, vec!["Swimming Pool"]);

    let search = ListingSearch {
        city: Some("los ang".into()),
        max_price: Some(100),
        ..ListingSearch::default()
    };
    assert!(listings::repo::find_all(&pool, &search).await.unwrap().is_empty());
    assert_eq!(listings::repo::search(&pool, "giant").await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn booking_prices_by_the_hour(pool: PgPool) {
    let owner = users::repo::register(&pool, &new_user("host@test.com")).await.unwrap();
    let renter = users::repo::register(&pool, &new_user("guest@test.com")).await.unwrap();
    let listing = listings::repo::create(&pool, &new_listing(owner.id, "9 party ln"))
        .await
        .unwrap();

    let booking = NewBooking {
        listing_id: listing.id,
        start_date: date!(2024 - 07 - 04),
        start_hour: 14,
        num_hours: 3,
    };
    let booked = users::repo::book_listing(&pool, renter.id, &booking).await.unwrap();
    assert_eq!(booked.total_price, 600);

    let short = NewBooking { num_hours: 1, ..booking };
    let err = users::repo::book_listing(&pool, renter.id, &short).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let details = users::repo::get(&pool, renter.id).await.unwrap();
    assert_eq!(details.bookings.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn tags_and_messages_lifecycle(pool: PgPool) {
    let new_tag = NewTag {
        handle: "bbq".into(),
        description: "Barbecue".into(),
    };
    tags::repo::create(&pool, &new_tag).await.unwrap();
    let err = tags::repo::create(&pool, &new_tag).await.unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Duplicate tag: bbq"));
    let renamed = tags::repo::update(&pool, "bbq", &object(json!({ "description": "Grill" })))
        .await
        .unwrap();
    assert_eq!(renamed.description, "Grill");
    tags::repo::remove(&pool, "bbq").await.unwrap();

    let a = users::repo::register(&pool, &new_user("a@test.com")).await.unwrap();
    let b = users::repo::register(&pool, &new_user("b@test.com")).await.unwrap();
    let listing = listings::repo::create(&pool, &new_listing(a.id, "5 chat st")).await.unwrap();

    let sent = messages::repo::create(
        &pool,
        &NewMessage {
            listing_id: listing.id,
            from_user_id: b.id,
            to_user_id: a.id,
            message: "is the pool heated?".into(),
        },
    )
    .await
    .unwrap();

    let search = MessageSearch {
        to_user_id: Some(a.id),
        ..MessageSearch::default()
    };
    let inbox = messages::repo::find_all(&pool, &search).await.unwrap();
    assert_eq!(inbox, vec![sent.clone()]);

    let edited = messages::repo::update(&pool, sent.id, &object(json!({ "message": "never mind" })))
        .await
        .unwrap();
    assert_eq!(edited.message, "never mind");
    assert_eq!(edited.sent_at, sent.sent_at);
    messages::repo::remove(&pool, sent.id).await.unwrap();
}

async fn call(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn http_listing_created_and_found_by_tag(pool: PgPool) {
    let owner = users::repo::register(&pool, &new_user("http@test.com")).await.unwrap();
    let app = build_app(AppState::fake_with_pool(pool));

    let (status, created) = call(
        &app,
        Method::POST,
        "/listings",
        Some(json!({
            "address": "200 stinker ave",
            "city": "Los Angeles",
            "state": "CA",
            "zip": "90027",
            "country": "USA",
            "ownerId": owner.id,
            "title": "GIANT HOUSE ON THE HILL",
            "pricePerHour": 200,
            "minHours": 6,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["listing"]["id"].clone();
    assert_eq!(
        created["listing"],
        json!({
            "id": id,
            "address": "200 stinker ave",
            "unit": null,
            "city": "Los Angeles",
            "state": "CA",
            "zip": "90027",
            "country": "USA",
            "ownerId": owner.id,
            "title": "GIANT HOUSE ON THE HILL",
            "description": null,
            "photoUrl": null,
            "pricePerHour": 200,
            "minHours": 6,
        })
    );

    let (status, fetched) = call(&app, Method::GET, &format!("/listings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["listing"]["address"], json!("200 stinker ave"));
    assert_eq!(fetched["listing"]["tags"], json!([]));

    let (status, tagged) = call(
        &app,
        Method::POST,
        "/listings/tags",
        Some(json!({ "listingId": id, "handle": "pool" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tagged, json!({ "tagged": { "listingId": id, "handle": "pool" } }));

    let (status, found) = call(&app, Method::GET, "/listings/tags/pool", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["listings"][0]["id"], id);
    assert_eq!(found["listings"][0]["tags"], json!(["Swimming Pool"]));

    let (status, body) = call(&app, Method::GET, "/listings/tags/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["status"], json!(404));

    let (status, deleted) = call(&app, Method::DELETE, &format!("/listings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "deleted": id }));
}
