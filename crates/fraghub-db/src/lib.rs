pub mod announcements;
pub mod events;
pub mod forum;
pub mod gallery;
pub mod materials;
pub mod portfolio;
pub mod posts;
pub mod surveys;
pub mod users;
pub mod votes;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub type DbPool = sqlx::SqlitePool;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("not found")]
    NotFound,
    #[error("unique constraint violated")]
    UniqueViolation,
}

/// Like the `From` conversion, but surfaces UNIQUE constraint failures as
/// [`DbError::UniqueViolation`] so callers can turn them into domain errors.
pub(crate) fn classify(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::UniqueViolation,
        _ => DbError::Sqlx(err),
    }
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations: applied successfully");
    Ok(())
}

/// Round-trips a trivial query; used by the status endpoint.
pub async fn ping(pool: &DbPool) -> Result<(), DbError> {
    let _: i64 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{create_pool, run_migrations, DbPool};

    pub async fn test_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    pub async fn user(pool: &DbPool, name: &str) -> i64 {
        crate::users::create_user(pool, name, &format!("{name}@example.com"), "hash")
            .await
            .unwrap()
            .id
    }
}

#[cfg(test)]
mod tests {
    use super::{create_pool, ping, run_migrations};

    #[tokio::test]
    async fn create_pool_supports_in_memory_sqlite() {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        let value: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(value, 1);
        ping(&pool).await.expect("ping");
    }

    #[tokio::test]
    async fn migrations_seed_forum_categories() {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_categories")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn file_database_is_created_on_demand() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("fraghub.db").display());
        let pool = create_pool(&url, 2).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        assert!(dir.path().join("fraghub.db").exists());
    }
}
