use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::GalleryMediaType;

const ITEM_SELECT: &str = "SELECT g.id, g.user_id, u.username AS author_username, g.title,
        g.media_url, g.media_type, g.description, g.is_approved, g.likes, g.created_at
    FROM gallery_items g
    JOIN users u ON u.id = g.user_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaItemRow {
    pub id: i64,
    pub user_id: i64,
    pub author_username: String,
    pub title: String,
    pub media_url: String,
    pub media_type: String,
    pub description: String,
    pub is_approved: bool,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

pub async fn create_item(
    pool: &DbPool,
    user_id: i64,
    title: &str,
    media_url: &str,
    media_type: GalleryMediaType,
    description: &str,
    is_approved: bool,
) -> Result<MediaItemRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO gallery_items (user_id, title, media_url, media_type, description, is_approved)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING id",
    )
    .bind(user_id)
    .bind(title)
    .bind(media_url)
    .bind(media_type.as_str())
    .bind(description)
    .bind(is_approved)
    .fetch_one(pool)
    .await?;
    get_item(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_item(pool: &DbPool, id: i64) -> Result<Option<MediaItemRow>, DbError> {
    let sql = format!("{ITEM_SELECT} WHERE g.id = ?1");
    let row = sqlx::query_as::<_, MediaItemRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Replaces the editable fields and sets the approval flag as decided by the caller.
pub async fn update_item(
    pool: &DbPool,
    id: i64,
    title: &str,
    media_url: &str,
    media_type: GalleryMediaType,
    description: &str,
    is_approved: bool,
) -> Result<MediaItemRow, DbError> {
    let result = sqlx::query(
        "UPDATE gallery_items
         SET title = ?2, media_url = ?3, media_type = ?4, description = ?5, is_approved = ?6
         WHERE id = ?1",
    )
    .bind(id)
    .bind(title)
    .bind(media_url)
    .bind(media_type.as_str())
    .bind(description)
    .bind(is_approved)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_item(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_item(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM gallery_items WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_approved(pool: &DbPool, id: i64, approved: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE gallery_items SET is_approved = ?2 WHERE id = ?1")
        .bind(id)
        .bind(approved)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Atomic increment; returns the new like count.
pub async fn add_like(pool: &DbPool, id: i64) -> Result<i64, DbError> {
    sqlx::query_scalar("UPDATE gallery_items SET likes = likes + 1 WHERE id = ?1 RETURNING likes")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Approved items, newest first, optionally of one media type.
pub async fn list_approved(
    pool: &DbPool,
    media_type: Option<GalleryMediaType>,
) -> Result<Vec<MediaItemRow>, DbError> {
    let rows = match media_type {
        Some(media_type) => {
            let sql = format!(
                "{ITEM_SELECT} WHERE g.is_approved = 1 AND g.media_type = ?1
                 ORDER BY g.created_at DESC, g.id DESC"
            );
            sqlx::query_as::<_, MediaItemRow>(&sql)
                .bind(media_type.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("{ITEM_SELECT} WHERE g.is_approved = 1 ORDER BY g.created_at DESC, g.id DESC");
            sqlx::query_as::<_, MediaItemRow>(&sql).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

pub async fn list_popular(pool: &DbPool, limit: i64) -> Result<Vec<MediaItemRow>, DbError> {
    let sql = format!("{ITEM_SELECT} WHERE g.is_approved = 1 ORDER BY g.likes DESC, g.id DESC LIMIT ?1");
    let rows = sqlx::query_as::<_, MediaItemRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Moderation queue, newest first.
pub async fn list_pending(pool: &DbPool) -> Result<Vec<MediaItemRow>, DbError> {
    let sql = format!("{ITEM_SELECT} WHERE g.is_approved = 0 ORDER BY g.created_at DESC, g.id DESC");
    let rows = sqlx::query_as::<_, MediaItemRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn list_by_user(
    pool: &DbPool,
    user_id: i64,
    include_unapproved: bool,
) -> Result<Vec<MediaItemRow>, DbError> {
    let sql = format!(
        "{ITEM_SELECT} WHERE g.user_id = ?1 AND (?2 OR g.is_approved = 1)
         ORDER BY g.created_at DESC, g.id DESC"
    );
    let rows = sqlx::query_as::<_, MediaItemRow>(&sql)
        .bind(user_id)
        .bind(include_unapproved)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count_approved(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM gallery_items WHERE is_approved = 1")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_by_user(pool: &DbPool, user_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM gallery_items WHERE user_id = ?1 AND is_approved = 1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
