use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::{
    error::{is_foreign_key_violation, violated_constraint, ApiError, ApiResult},
    sql::{Column, ColumnMap, PartialUpdate, WhereClause},
};

use super::{
    dto::{MessageSearch, NewMessage, SAME_USER},
    repo_types::Message,
};

const MESSAGE_COLUMNS: &str = "id, listing_id, from_user_id, to_user_id, message, sent_at";

/// Fields a PATCH /messages/:id body may carry.
pub const MESSAGE_UPDATE_COLUMNS: ColumnMap =
    ColumnMap::new(&[("message", Column::text("message"))]);

fn no_message(id: i32) -> ApiError {
    ApiError::NotFound(format!("No message: {id}"))
}

/// Store a message about a listing. The listing and both users must exist.
pub async fn create(db: &PgPool, new: &NewMessage) -> ApiResult<Message> {
    if new.from_user_id == new.to_user_id {
        warn!(user_id = new.from_user_id, "message to self refused");
        return Err(ApiError::BadRequest(SAME_USER.into()));
    }

    let sql = format!(
        "INSERT INTO messages (listing_id, from_user_id, to_user_id, message) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {MESSAGE_COLUMNS}"
    );
    let message = sqlx::query_as::<_, Message>(&sql)
        .bind(new.listing_id)
        .bind(new.from_user_id)
        .bind(new.to_user_id)
        .bind(&new.message)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                missing_reference(violated_constraint(&e), new)
            } else {
                e.into()
            }
        })?;
    Ok(message)
}

fn missing_reference(constraint: Option<&str>, new: &NewMessage) -> ApiError {
    let message = match constraint {
        Some("messages_listing_id_fkey") => format!("No listing: {}", new.listing_id),
        Some("messages_from_user_id_fkey") => format!("No user: {}", new.from_user_id),
        Some("messages_to_user_id_fkey") => format!("No user: {}", new.to_user_id),
        _ => format!(
            "No listing {} or user {}/{}",
            new.listing_id, new.from_user_id, new.to_user_id
        ),
    };
    ApiError::NotFound(message)
}

/// Messages matching every supplied filter, grouped by listing.
pub async fn find_all(db: &PgPool, search: &MessageSearch) -> ApiResult<Vec<Message>> {
    if let (Some(from), Some(to)) = (search.from_user_id, search.to_user_id) {
        if from == to {
            return Err(ApiError::BadRequest(SAME_USER.into()));
        }
    }

    let filter = WhereClause::new()
        .eq("listing_id", search.listing_id)
        .eq("from_user_id", search.from_user_id)
        .eq("to_user_id", search.to_user_id);
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages {} ORDER BY listing_id, id",
        filter.sql()
    );
    debug!(%sql, "find messages");

    let messages = filter
        .bind(sqlx::query_as::<_, Message>(&sql))
        .fetch_all(db)
        .await?;
    Ok(messages)
}

pub async fn get(db: &PgPool, id: i32) -> ApiResult<Message> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
    sqlx::query_as::<_, Message>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_message(id))
}

pub async fn update(db: &PgPool, id: i32, changes: &Map<String, Value>) -> ApiResult<Message> {
    let update = PartialUpdate::build(changes, &MESSAGE_UPDATE_COLUMNS)?;
    let sql = format!(
        "UPDATE messages SET {} WHERE id = {} RETURNING {MESSAGE_COLUMNS}",
        update.set_clause(),
        update.next_placeholder(),
    );
    debug!(%sql, "update message");

    update
        .bind(sqlx::query_as::<_, Message>(&sql))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_message(id))
}

pub async fn remove(db: &PgPool, id: i32) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(no_message(id));
    }
    Ok(())
}
