use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::AnnouncementType;

const ANNOUNCEMENT_SELECT: &str = "SELECT a.id, a.title, a.content, a.author_id,
        u.username AS author_username, a.announcement_type, a.is_pinned, a.created_at, a.updated_at
    FROM announcements a
    JOIN users u ON u.id = a.author_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub announcement_type: String,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_announcement(
    pool: &DbPool,
    author_id: i64,
    title: &str,
    content: &str,
    announcement_type: AnnouncementType,
    is_pinned: bool,
) -> Result<AnnouncementRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO announcements (author_id, title, content, announcement_type, is_pinned)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id",
    )
    .bind(author_id)
    .bind(title)
    .bind(content)
    .bind(announcement_type.as_str())
    .bind(is_pinned)
    .fetch_one(pool)
    .await?;
    get_announcement(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_announcement(pool: &DbPool, id: i64) -> Result<Option<AnnouncementRow>, DbError> {
    let sql = format!("{ANNOUNCEMENT_SELECT} WHERE a.id = ?1");
    let row = sqlx::query_as::<_, AnnouncementRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_announcement(
    pool: &DbPool,
    id: i64,
    title: &str,
    content: &str,
    announcement_type: AnnouncementType,
    is_pinned: bool,
) -> Result<AnnouncementRow, DbError> {
    let result = sqlx::query(
        "UPDATE announcements
         SET title = ?2, content = ?3, announcement_type = ?4, is_pinned = ?5,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
    )
    .bind(id)
    .bind(title)
    .bind(content)
    .bind(announcement_type.as_str())
    .bind(is_pinned)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_announcement(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_announcement(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns the new pinned flag.
pub async fn toggle_pin(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    sqlx::query_scalar(
        "UPDATE announcements SET is_pinned = NOT is_pinned WHERE id = ?1 RETURNING is_pinned",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Newest first with the given pinned flag; `limit` of `-1` returns all.
pub async fn list_announcements(
    pool: &DbPool,
    pinned: bool,
    limit: i64,
) -> Result<Vec<AnnouncementRow>, DbError> {
    let sql = format!(
        "{ANNOUNCEMENT_SELECT} WHERE a.is_pinned = ?1 ORDER BY a.created_at DESC, a.id DESC LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, AnnouncementRow>(&sql)
        .bind(pinned)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_by_type(
    pool: &DbPool,
    announcement_type: AnnouncementType,
) -> Result<Vec<AnnouncementRow>, DbError> {
    let sql = format!(
        "{ANNOUNCEMENT_SELECT} WHERE a.announcement_type = ?1
         ORDER BY a.is_pinned DESC, a.created_at DESC, a.id DESC"
    );
    let rows = sqlx::query_as::<_, AnnouncementRow>(&sql)
        .bind(announcement_type.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_pool, user};

    #[tokio::test]
    async fn pinned_and_regular_lists_are_disjoint() {
        let pool = test_pool().await;
        let admin = user(&pool, "admin").await;
        let rules = create_announcement(&pool, admin, "Rules", "be nice", AnnouncementType::Rules, true)
            .await
            .unwrap();
        create_announcement(&pool, admin, "Cup", "sign up", AnnouncementType::Tournament, false)
            .await
            .unwrap();

        let pinned = list_announcements(&pool, true, -1).await.unwrap();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].id, rules.id);
        assert_eq!(list_announcements(&pool, false, -1).await.unwrap().len(), 1);
        assert_eq!(list_by_type(&pool, AnnouncementType::Tournament).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pin_toggle_and_update() {
        let pool = test_pool().await;
        let admin = user(&pool, "admin").await;
        let item = create_announcement(&pool, admin, "Maint", "down", AnnouncementType::Server, false)
            .await
            .unwrap();
        assert!(toggle_pin(&pool, item.id).await.unwrap());

        let updated = update_announcement(&pool, item.id, "Maint", "back up", AnnouncementType::Server, false)
            .await
            .unwrap();
        assert_eq!(updated.content, "back up");
        assert!(!updated.is_pinned);
        assert!(delete_announcement(&pool, item.id).await.unwrap());
        assert!(get_announcement(&pool, item.id).await.unwrap().is_none());
    }
}
