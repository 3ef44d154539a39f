use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::PostMediaType;
use sqlx::SqliteConnection;

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username AS author_username, p.content,
        p.media_type, p.media_url, p.is_pinned, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count
    FROM posts p
    JOIN users u ON u.id = p.author_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author_username,
        c.content, c.created_at, c.updated_at
    FROM post_comments c
    JOIN users u ON u.id = c.author_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub media_type: String,
    pub media_url: Option<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HashtagCountRow {
    pub name: String,
    pub post_count: i64,
}

async fn replace_hashtags(
    conn: &mut SqliteConnection,
    post_id: i64,
    hashtags: &[String],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM post_hashtags WHERE post_id = ?1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    for name in hashtags {
        sqlx::query("INSERT INTO hashtags (name) VALUES (?1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id)
             SELECT ?1, id FROM hashtags WHERE name = ?2",
        )
        .bind(post_id)
        .bind(name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Insert a post with its (already normalised) hashtags.
pub async fn create_post(
    pool: &DbPool,
    author_id: i64,
    content: &str,
    media_type: PostMediaType,
    media_url: Option<&str>,
    hashtags: &[String],
) -> Result<PostRow, DbError> {
    let mut tx = pool.begin().await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (author_id, content, media_type, media_url)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id",
    )
    .bind(author_id)
    .bind(content)
    .bind(media_type.as_str())
    .bind(media_url)
    .fetch_one(&mut *tx)
    .await?;
    replace_hashtags(&mut *tx, id, hashtags).await?;
    tx.commit().await?;

    get_post(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_post(pool: &DbPool, id: i64) -> Result<Option<PostRow>, DbError> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    let row = sqlx::query_as::<_, PostRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Replaces content, media and the hashtag set.
pub async fn update_post(
    pool: &DbPool,
    id: i64,
    content: &str,
    media_type: PostMediaType,
    media_url: Option<&str>,
    hashtags: &[String],
) -> Result<PostRow, DbError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE posts
         SET content = ?2, media_type = ?3, media_url = ?4,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
    )
    .bind(id)
    .bind(content)
    .bind(media_type.as_str())
    .bind(media_url)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    replace_hashtags(&mut *tx, id, hashtags).await?;
    tx.commit().await?;

    get_post(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_post(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Posts with the given pinned flag, newest first.
pub async fn list_posts(pool: &DbPool, pinned: bool, limit: i64) -> Result<Vec<PostRow>, DbError> {
    let sql = format!("{POST_SELECT} WHERE p.is_pinned = ?1 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2");
    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(pinned)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_latest_posts(pool: &DbPool, limit: i64) -> Result<Vec<PostRow>, DbError> {
    let sql = format!("{POST_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT ?1");
    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_posts_by_user(pool: &DbPool, author_id: i64) -> Result<Vec<PostRow>, DbError> {
    let sql = format!("{POST_SELECT} WHERE p.author_id = ?1 ORDER BY p.created_at DESC, p.id DESC");
    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(author_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_posts_by_hashtag(pool: &DbPool, name: &str) -> Result<Vec<PostRow>, DbError> {
    let sql = format!(
        "{POST_SELECT}
         JOIN post_hashtags ph ON ph.post_id = p.id
         JOIN hashtags h ON h.id = ph.hashtag_id
         WHERE h.name = ?1
         ORDER BY p.created_at DESC, p.id DESC"
    );
    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(name)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_post_hashtags(pool: &DbPool, post_id: i64) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar(
        "SELECT h.name FROM hashtags h
         JOIN post_hashtags ph ON ph.hashtag_id = h.id
         WHERE ph.post_id = ?1
         ORDER BY h.name ASC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn hashtag_exists(pool: &DbPool, name: &str) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hashtags WHERE name = ?1")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Hashtags ranked by how many posts carry them; `limit` of `-1` returns all.
pub async fn trending_hashtags(pool: &DbPool, limit: i64) -> Result<Vec<HashtagCountRow>, DbError> {
    let rows = sqlx::query_as::<_, HashtagCountRow>(
        "SELECT h.name, COUNT(ph.post_id) AS post_count
         FROM hashtags h
         LEFT JOIN post_hashtags ph ON ph.hashtag_id = h.id
         GROUP BY h.id
         ORDER BY post_count DESC, h.name ASC
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Flip the caller's like on a post; returns whether the post is now liked.
pub async fn toggle_like(pool: &DbPool, post_id: i64, user_id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if removed == 0 {
        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(removed == 0)
}

pub async fn has_liked(pool: &DbPool, post_id: i64, user_id: i64) -> Result<bool, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = ?1 AND user_id = ?2")
            .bind(post_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Returns the new pinned flag.
pub async fn toggle_pin(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    sqlx::query_scalar("UPDATE posts SET is_pinned = NOT is_pinned WHERE id = ?1 RETURNING is_pinned")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn count_posts(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_posts_since(pool: &DbPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE julianday(created_at) >= julianday(?1)",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn count_posts_by_user(pool: &DbPool, author_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create_comment(
    pool: &DbPool,
    post_id: i64,
    author_id: i64,
    content: &str,
) -> Result<CommentRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO post_comments (post_id, author_id, content) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(post_id)
    .bind(author_id)
    .bind(content)
    .fetch_one(pool)
    .await?;
    get_comment(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_comment(pool: &DbPool, id: i64) -> Result<Option<CommentRow>, DbError> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    let row = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_comment(pool: &DbPool, id: i64, content: &str) -> Result<CommentRow, DbError> {
    let result = sqlx::query(
        "UPDATE post_comments
         SET content = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
    )
    .bind(id)
    .bind(content)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_comment(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_comment(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM post_comments WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Oldest first, as a conversation reads.
pub async fn list_comments(pool: &DbPool, post_id: i64) -> Result<Vec<CommentRow>, DbError> {
    let sql = format!("{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC");
    let rows = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_pool, user};

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn create_post_links_hashtags() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let post = create_post(&pool, author, "ace on mirage", PostMediaType::None, None, &tags(&["mirage", "ace"]))
            .await
            .unwrap();

        assert_eq!(post.author_username, "author");
        assert_eq!(post.like_count, 0);
        assert_eq!(get_post_hashtags(&pool, post.id).await.unwrap(), tags(&["ace", "mirage"]));
        assert_eq!(list_posts_by_hashtag(&pool, "ace").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_post_replaces_hashtags() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let post = create_post(&pool, author, "v1", PostMediaType::None, None, &tags(&["old"]))
            .await
            .unwrap();
        let updated = update_post(&pool, post.id, "v2", PostMediaType::Image, Some("https://i/1.png"), &tags(&["new"]))
            .await
            .unwrap();

        assert_eq!(updated.content, "v2");
        assert_eq!(get_post_hashtags(&pool, post.id).await.unwrap(), tags(&["new"]));
        assert!(list_posts_by_hashtag(&pool, "old").await.unwrap().is_empty());
        assert!(hashtag_exists(&pool, "old").await.unwrap());
    }

    #[tokio::test]
    async fn like_toggles_on_and_off() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let fan = user(&pool, "fan").await;
        let post = create_post(&pool, author, "clutch", PostMediaType::None, None, &[])
            .await
            .unwrap();

        assert!(toggle_like(&pool, post.id, fan).await.unwrap());
        assert_eq!(get_post(&pool, post.id).await.unwrap().unwrap().like_count, 1);
        assert!(!toggle_like(&pool, post.id, fan).await.unwrap());
        assert!(!has_liked(&pool, post.id, fan).await.unwrap());
    }

    #[tokio::test]
    async fn pin_toggle_splits_listings() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let post = create_post(&pool, author, "rules", PostMediaType::None, None, &[])
            .await
            .unwrap();

        assert!(toggle_pin(&pool, post.id).await.unwrap());
        assert_eq!(list_posts(&pool, true, 10).await.unwrap().len(), 1);
        assert!(list_posts(&pool, false, 10).await.unwrap().is_empty());
        assert!(!toggle_pin(&pool, post.id).await.unwrap());
        assert!(matches!(toggle_pin(&pool, 999).await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn trending_hashtags_rank_by_usage() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        create_post(&pool, author, "a", PostMediaType::None, None, &tags(&["cs2", "nuke"]))
            .await
            .unwrap();
        create_post(&pool, author, "b", PostMediaType::None, None, &tags(&["cs2"]))
            .await
            .unwrap();

        let trending = trending_hashtags(&pool, 10).await.unwrap();
        assert_eq!(trending[0].name, "cs2");
        assert_eq!(trending[0].post_count, 2);
        assert_eq!(count_posts_by_user(&pool, author).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn comments_crud() {
        let pool = test_pool().await;
        let author = user(&pool, "author").await;
        let post = create_post(&pool, author, "gg", PostMediaType::None, None, &[])
            .await
            .unwrap();
        let first = create_comment(&pool, post.id, author, "first").await.unwrap();
        create_comment(&pool, post.id, author, "second").await.unwrap();

        let edited = update_comment(&pool, first.id, "edited").await.unwrap();
        assert_eq!(edited.content, "edited");
        let comments = list_comments(&pool, post.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, first.id);
        assert!(delete_comment(&pool, first.id).await.unwrap());
        assert_eq!(list_comments(&pool, post.id).await.unwrap().len(), 1);
    }
}
