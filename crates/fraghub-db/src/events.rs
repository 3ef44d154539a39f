use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::EventType;

const EVENT_COLUMNS: &str =
    "id, title, description, event_type, starts_at, ends_at, location, image_url, is_active, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Writable event fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct EventFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub event_type: EventType,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: &'a str,
    pub image_url: Option<&'a str>,
    pub is_active: bool,
}

pub async fn create_event(pool: &DbPool, fields: &EventFields<'_>) -> Result<EventRow, DbError> {
    let sql = format!(
        "INSERT INTO events (title, description, event_type, starts_at, ends_at, location, image_url, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         RETURNING {EVENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.event_type.as_str())
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(fields.location)
        .bind(fields.image_url)
        .bind(fields.is_active)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_event(pool: &DbPool, id: i64) -> Result<Option<EventRow>, DbError> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_event(pool: &DbPool, id: i64, fields: &EventFields<'_>) -> Result<EventRow, DbError> {
    let sql = format!(
        "UPDATE events
         SET title = ?2, description = ?3, event_type = ?4, starts_at = ?5, ends_at = ?6,
             location = ?7, image_url = ?8, is_active = ?9
         WHERE id = ?1
         RETURNING {EVENT_COLUMNS}"
    );
    sqlx::query_as::<_, EventRow>(&sql)
        .bind(id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.event_type.as_str())
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(fields.location)
        .bind(fields.image_url)
        .bind(fields.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_event(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Active events, soonest first, optionally of one type.
pub async fn list_active(pool: &DbPool, event_type: Option<EventType>) -> Result<Vec<EventRow>, DbError> {
    let rows = match event_type {
        Some(event_type) => {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE is_active = 1 AND event_type = ?1
                 ORDER BY starts_at ASC, id ASC"
            );
            sqlx::query_as::<_, EventRow>(&sql)
                .bind(event_type.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE is_active = 1 ORDER BY starts_at ASC, id ASC"
            );
            sqlx::query_as::<_, EventRow>(&sql).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

pub async fn list_upcoming(pool: &DbPool, now: DateTime<Utc>, limit: i64) -> Result<Vec<EventRow>, DbError> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE is_active = 1 AND julianday(starts_at) >= julianday(?1)
         ORDER BY starts_at ASC, id ASC
         LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Events that already started, most recent first.
pub async fn list_past(pool: &DbPool, now: DateTime<Utc>) -> Result<Vec<EventRow>, DbError> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE julianday(starts_at) < julianday(?1)
         ORDER BY starts_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
