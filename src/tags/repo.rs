use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::debug;

use crate::{
    error::{is_unique_violation, ApiError, ApiResult},
    sql::{Column, ColumnMap, PartialUpdate},
};

use super::{dto::NewTag, repo_types::Tag};

/// Fields a PATCH /tags/:handle body may carry; the handle is the key.
pub const TAG_COLUMNS: ColumnMap = ColumnMap::new(&[("description", Column::text("description"))]);

fn no_tag(handle: &str) -> ApiError {
    ApiError::NotFound(format!("No tag: {handle}"))
}

pub async fn create(db: &PgPool, new: &NewTag) -> ApiResult<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (handle, description)
        VALUES ($1, $2)
        RETURNING handle, description
        "#,
    )
    .bind(&new.handle)
    .bind(&new.description)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::BadRequest(format!("Duplicate tag: {}", new.handle))
        } else {
            e.into()
        }
    })?;
    Ok(tag)
}

pub async fn find_all(db: &PgPool) -> ApiResult<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>("SELECT handle, description FROM tags ORDER BY handle")
        .fetch_all(db)
        .await?;
    Ok(tags)
}

pub async fn get(db: &PgPool, handle: &str) -> ApiResult<Tag> {
    sqlx::query_as::<_, Tag>("SELECT handle, description FROM tags WHERE handle = $1")
        .bind(handle)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_tag(handle))
}

pub async fn update(db: &PgPool, handle: &str, changes: &Map<String, Value>) -> ApiResult<Tag> {
    let update = PartialUpdate::build(changes, &TAG_COLUMNS)?;
    let sql = format!(
        "UPDATE tags SET {} WHERE handle = {} RETURNING handle, description",
        update.set_clause(),
        update.next_placeholder(),
    );
    debug!(%sql, "update tag");

    update
        .bind(sqlx::query_as::<_, Tag>(&sql))
        .bind(handle)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| no_tag(handle))
}

pub async fn remove(db: &PgPool, handle: &str) -> ApiResult<()> {
    let result = sqlx::query("DELETE FROM tags WHERE handle = $1")
        .bind(handle)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(no_tag(handle));
    }
    Ok(())
}
