use crate::{classify, DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::role::Role;

const USER_COLUMNS: &str =
    "id, username, email, role, bio, avatar_url, steam_profile, created_at";

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub steam_profile: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Stored role; the CHECK constraint keeps the column within the known set.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAuthRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PosterRow {
    pub user_id: i64,
    pub username: String,
    pub post_count: i64,
}

pub async fn create_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, DbError> {
    let sql = format!(
        "INSERT INTO users (username, email, password_hash)
         VALUES (?1, ?2, ?3)
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(username.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(classify)
}

/// Create a user and atomically promote them to admin if they are the first one.
/// Uses a transaction to prevent registration races.
pub async fn create_user_as_first_admin(
    pool: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, DbError> {
    let mut tx = pool.begin().await?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    let role = if count == 0 { Role::Admin } else { Role::User };

    let sql = format!(
        "INSERT INTO users (username, email, password_hash, role)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(username.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

    tx.commit().await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn get_user_auth_by_username(
    pool: &DbPool,
    username: &str,
) -> Result<Option<UserAuthRow>, DbError> {
    let row = sqlx::query_as::<_, UserAuthRow>(
        "SELECT id, username, password_hash, role FROM users WHERE username = ?1",
    )
    .bind(username.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn update_profile(
    pool: &DbPool,
    id: i64,
    bio: Option<&str>,
    avatar_url: Option<&str>,
    steam_profile: Option<&str>,
) -> Result<UserRow, DbError> {
    let sql = format!(
        "UPDATE users
         SET bio = COALESCE(?2, bio),
             avatar_url = COALESCE(?3, avatar_url),
             steam_profile = COALESCE(?4, steam_profile)
         WHERE id = ?1
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .bind(bio)
        .bind(avatar_url)
        .bind(steam_profile)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn set_role(pool: &DbPool, id: i64, role: Role) -> Result<UserRow, DbError> {
    let sql = format!("UPDATE users SET role = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_user(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Newest accounts first, optionally restricted to one role.
pub async fn list_users(pool: &DbPool, role: Option<Role>) -> Result<Vec<UserRow>, DbError> {
    let rows = match role {
        Some(role) => {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY created_at DESC, id DESC"
            );
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(role.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
            sqlx::query_as::<_, UserRow>(&sql).fetch_all(pool).await?
        }
    };
    Ok(rows)
}

pub async fn count_users(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_users_since(pool: &DbPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE julianday(created_at) >= julianday(?1)",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn top_posters(pool: &DbPool, limit: i64) -> Result<Vec<PosterRow>, DbError> {
    let rows = sqlx::query_as::<_, PosterRow>(
        "SELECT u.id AS user_id, u.username, COUNT(p.id) AS post_count
         FROM users u
         LEFT JOIN posts p ON p.author_id = u.id
         GROUP BY u.id
         ORDER BY post_count DESC, u.id ASC
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    #[tokio::test]
    async fn first_registered_user_becomes_admin() {
        let pool = test_pool().await;
        let first = create_user_as_first_admin(&pool, "first", "First@Example.com", "h")
            .await
            .unwrap();
        let second = create_user_as_first_admin(&pool, "second", "second@example.com", "h")
            .await
            .unwrap();
        assert_eq!(first.role(), Role::Admin);
        assert_eq!(second.role(), Role::User);
        assert_eq!(first.email, "first@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let pool = test_pool().await;
        create_user(&pool, "s1mple", "a@example.com", "h").await.unwrap();
        let err = create_user(&pool, "S1MPLE", "b@example.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation));
    }

    #[tokio::test]
    async fn update_profile_keeps_unset_fields() {
        let pool = test_pool().await;
        let user = create_user(&pool, "zywoo", "z@example.com", "h").await.unwrap();
        update_profile(&pool, user.id, Some("awper"), None, None)
            .await
            .unwrap();
        let updated = update_profile(&pool, user.id, None, Some("https://img/a.png"), None)
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("awper"));
        assert_eq!(updated.avatar_url.as_deref(), Some("https://img/a.png"));
    }

    #[tokio::test]
    async fn list_users_filters_by_role() {
        let pool = test_pool().await;
        let a = create_user(&pool, "a", "a@example.com", "h").await.unwrap();
        create_user(&pool, "b", "b@example.com", "h").await.unwrap();
        set_role(&pool, a.id, Role::Moderator).await.unwrap();

        let mods = list_users(&pool, Some(Role::Moderator)).await.unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].id, a.id);
        assert_eq!(list_users(&pool, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_role_on_missing_user_is_not_found() {
        let pool = test_pool().await;
        let err = set_role(&pool, 404, Role::Admin).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[tokio::test]
    async fn auth_lookup_is_case_insensitive() {
        let pool = test_pool().await;
        create_user(&pool, "NiKo", "niko@example.com", "secret-hash")
            .await
            .unwrap();
        let auth = get_user_auth_by_username(&pool, "niko").await.unwrap().unwrap();
        assert_eq!(auth.password_hash, "secret-hash");
    }
}
