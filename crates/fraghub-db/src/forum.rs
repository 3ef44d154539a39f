use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

const TOPIC_SELECT: &str = "SELECT t.id, t.category_id, c.name AS category_name, t.title, t.content,
        t.created_by, u.username AS author_username, t.is_pinned, t.is_closed,
        t.created_at, t.updated_at,
        (SELECT COUNT(*) FROM forum_messages m WHERE m.topic_id = t.id) AS message_count
    FROM forum_topics t
    JOIN forum_categories c ON c.id = t.category_id
    JOIN users u ON u.id = t.created_by";

const MESSAGE_SELECT: &str = "SELECT m.id, m.topic_id, m.author_id, u.username AS author_username,
        m.text, m.created_at, m.updated_at
    FROM forum_messages m
    JOIN users u ON u.id = m.author_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub topic_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopicRow {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub title: String,
    pub content: String,
    pub created_by: i64,
    pub author_username: String,
    pub is_pinned: bool,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub topic_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_categories(pool: &DbPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT c.id, c.name, c.description, c.icon,
                (SELECT COUNT(*) FROM forum_topics t WHERE t.category_id = c.id) AS topic_count
         FROM forum_categories c
         ORDER BY c.id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_category(pool: &DbPool, id: i64) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT c.id, c.name, c.description, c.icon,
                (SELECT COUNT(*) FROM forum_topics t WHERE t.category_id = c.id) AS topic_count
         FROM forum_categories c
         WHERE c.id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create_topic(
    pool: &DbPool,
    category_id: i64,
    created_by: i64,
    title: &str,
    content: &str,
) -> Result<TopicRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_topics (category_id, created_by, title, content)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id",
    )
    .bind(category_id)
    .bind(created_by)
    .bind(title)
    .bind(content)
    .fetch_one(pool)
    .await?;
    get_topic(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_topic(pool: &DbPool, id: i64) -> Result<Option<TopicRow>, DbError> {
    let sql = format!("{TOPIC_SELECT} WHERE t.id = ?1");
    let row = sqlx::query_as::<_, TopicRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_topic(
    pool: &DbPool,
    id: i64,
    category_id: i64,
    title: &str,
    content: &str,
) -> Result<TopicRow, DbError> {
    let result = sqlx::query(
        "UPDATE forum_topics
         SET category_id = ?2, title = ?3, content = ?4,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
    )
    .bind(id)
    .bind(category_id)
    .bind(title)
    .bind(content)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_topic(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_topic(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM forum_topics WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Pinned topics first, then newest first.
pub async fn list_topics(pool: &DbPool, category_id: Option<i64>) -> Result<Vec<TopicRow>, DbError> {
    let rows = match category_id {
        Some(category_id) => {
            let sql = format!(
                "{TOPIC_SELECT} WHERE t.category_id = ?1
                 ORDER BY t.is_pinned DESC, t.created_at DESC, t.id DESC"
            );
            sqlx::query_as::<_, TopicRow>(&sql)
                .bind(category_id)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("{TOPIC_SELECT} ORDER BY t.is_pinned DESC, t.created_at DESC, t.id DESC");
            sqlx::query_as::<_, TopicRow>(&sql).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

/// Returns the new pinned flag.
pub async fn toggle_topic_pin(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    sqlx::query_scalar(
        "UPDATE forum_topics SET is_pinned = NOT is_pinned WHERE id = ?1 RETURNING is_pinned",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the new closed flag.
pub async fn toggle_topic_closed(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    sqlx::query_scalar(
        "UPDATE forum_topics SET is_closed = NOT is_closed WHERE id = ?1 RETURNING is_closed",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn count_topics(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM forum_topics")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_topics_since(pool: &DbPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM forum_topics WHERE julianday(created_at) >= julianday(?1)",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn create_message(
    pool: &DbPool,
    topic_id: i64,
    author_id: i64,
    text: &str,
) -> Result<MessageRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_messages (topic_id, author_id, text) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(topic_id)
    .bind(author_id)
    .bind(text)
    .fetch_one(pool)
    .await?;
    get_message(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_message(pool: &DbPool, id: i64) -> Result<Option<MessageRow>, DbError> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
    let row = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_message(pool: &DbPool, id: i64, text: &str) -> Result<MessageRow, DbError> {
    let result = sqlx::query(
        "UPDATE forum_messages
         SET text = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
    )
    .bind(id)
    .bind(text)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_message(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_message(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM forum_messages WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_messages(pool: &DbPool, topic_id: i64) -> Result<Vec<MessageRow>, DbError> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.topic_id = ?1 ORDER BY m.created_at ASC, m.id ASC");
    let rows = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(topic_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_pool, user};

    #[tokio::test]
    async fn seeded_categories_are_listed() {
        let pool = test_pool().await;
        let categories = list_categories(&pool).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["maps", "updates", "matches", "settings", "memes"]);
    }

    #[tokio::test]
    async fn pinned_topics_come_first() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let old = create_topic(&pool, 1, author, "old", "body").await.unwrap();
        let new = create_topic(&pool, 1, author, "new", "body").await.unwrap();
        create_topic(&pool, 2, author, "elsewhere", "body").await.unwrap();
        assert!(toggle_topic_pin(&pool, old.id).await.unwrap());

        let topics = list_topics(&pool, Some(1)).await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].id, old.id);
        assert_eq!(topics[1].id, new.id);
        assert_eq!(list_topics(&pool, None).await.unwrap().len(), 3);
        assert_eq!(get_category(&pool, 1).await.unwrap().unwrap().topic_count, 2);
    }

    #[tokio::test]
    async fn close_toggle_flips_flag() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let topic = create_topic(&pool, 3, author, "match", "body").await.unwrap();
        assert!(!topic.is_closed);
        assert!(toggle_topic_closed(&pool, topic.id).await.unwrap());
        assert!(get_topic(&pool, topic.id).await.unwrap().unwrap().is_closed);
        assert!(!toggle_topic_closed(&pool, topic.id).await.unwrap());
    }

    #[tokio::test]
    async fn messages_are_listed_oldest_first() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let topic = create_topic(&pool, 1, author, "t", "body").await.unwrap();
        let first = create_message(&pool, topic.id, author, "one").await.unwrap();
        create_message(&pool, topic.id, author, "two").await.unwrap();

        update_message(&pool, first.id, "one (edited)").await.unwrap();
        let messages = list_messages(&pool, topic.id).await.unwrap();
        assert_eq!(messages[0].text, "one (edited)");
        assert_eq!(get_topic(&pool, topic.id).await.unwrap().unwrap().message_count, 2);
        assert!(delete_topic(&pool, topic.id).await.unwrap());
        assert!(get_message(&pool, first.id).await.unwrap().is_none());
    }
}
