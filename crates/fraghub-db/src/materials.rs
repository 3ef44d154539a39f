use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::MaterialCategory;

const MATERIAL_COLUMNS: &str = "id, title, description, category, file_url, link, youtube_embed, downloads,
    created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MaterialRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub file_url: Option<String>,
    pub link: Option<String>,
    pub youtube_embed: String,
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable material fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct MaterialFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: MaterialCategory,
    pub file_url: Option<&'a str>,
    pub link: Option<&'a str>,
    pub youtube_embed: &'a str,
}

pub async fn create_material(pool: &DbPool, fields: &MaterialFields<'_>) -> Result<MaterialRow, DbError> {
    let sql = format!(
        "INSERT INTO materials (title, description, category, file_url, link, youtube_embed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING {MATERIAL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.category.as_str())
        .bind(fields.file_url)
        .bind(fields.link)
        .bind(fields.youtube_embed)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_material(pool: &DbPool, id: i64) -> Result<Option<MaterialRow>, DbError> {
    let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?1");
    let row = sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Replaces the editable fields; the download counter is left alone.
pub async fn update_material(
    pool: &DbPool,
    id: i64,
    fields: &MaterialFields<'_>,
) -> Result<MaterialRow, DbError> {
    let sql = format!(
        "UPDATE materials
         SET title = ?2, description = ?3, category = ?4, file_url = ?5, link = ?6, youtube_embed = ?7,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1
         RETURNING {MATERIAL_COLUMNS}"
    );
    sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.category.as_str())
        .bind(fields.file_url)
        .bind(fields.link)
        .bind(fields.youtube_embed)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_material(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM materials WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Atomic increment; returns the new download count.
pub async fn add_download(pool: &DbPool, id: i64) -> Result<i64, DbError> {
    sqlx::query_scalar("UPDATE materials SET downloads = downloads + 1 WHERE id = ?1 RETURNING downloads")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Newest first, optionally of one category.
pub async fn list_materials(
    pool: &DbPool,
    category: Option<MaterialCategory>,
) -> Result<Vec<MaterialRow>, DbError> {
    let sql = format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials
         WHERE ?1 IS NULL OR category = ?1
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(category.map(MaterialCategory::as_str))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_popular(pool: &DbPool, limit: i64) -> Result<Vec<MaterialRow>, DbError> {
    let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY downloads DESC, id DESC LIMIT ?1");
    let rows = sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Other materials of `category`, newest first.
pub async fn list_similar(
    pool: &DbPool,
    category: &str,
    exclude_id: i64,
    limit: i64,
) -> Result<Vec<MaterialRow>, DbError> {
    let sql = format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials
         WHERE category = ?1 AND id != ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    );
    let rows = sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(category)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// (category label, material count) for every category that has materials.
pub async fn count_by_category(pool: &DbPool) -> Result<Vec<(String, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT category, COUNT(*) FROM materials GROUP BY category ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    fn fields(title: &str, category: MaterialCategory) -> MaterialFields<'_> {
        MaterialFields {
            title,
            description: "",
            category,
            file_url: Some("https://cdn.example.com/autoexec.cfg"),
            link: None,
            youtube_embed: "",
        }
    }

    #[tokio::test]
    async fn category_filter_and_counts() {
        let pool = test_pool().await;
        let cfg = create_material(&pool, &fields("s1mple cfg", MaterialCategory::Configs)).await.unwrap();
        create_material(&pool, &fields("zywoo cfg", MaterialCategory::Configs)).await.unwrap();
        create_material(&pool, &fields("smokes", MaterialCategory::Guides)).await.unwrap();

        assert_eq!(list_materials(&pool, None).await.unwrap().len(), 3);
        assert_eq!(list_materials(&pool, Some(MaterialCategory::Configs)).await.unwrap().len(), 2);
        assert!(list_materials(&pool, Some(MaterialCategory::Demos)).await.unwrap().is_empty());
        assert_eq!(
            count_by_category(&pool).await.unwrap(),
            vec![("configs".to_string(), 2), ("guides".to_string(), 1)]
        );

        let similar = list_similar(&pool, "configs", cfg.id, 4).await.unwrap();
        assert_eq!(similar.len(), 1);
        assert_ne!(similar[0].id, cfg.id);
    }

    #[tokio::test]
    async fn downloads_increment_atomically() {
        let pool = test_pool().await;
        let guide = create_material(&pool, &fields("nades", MaterialCategory::Guides)).await.unwrap();
        let other = create_material(&pool, &fields("aim map", MaterialCategory::Training)).await.unwrap();

        assert_eq!(add_download(&pool, guide.id).await.unwrap(), 1);
        assert_eq!(add_download(&pool, guide.id).await.unwrap(), 2);
        let popular = list_popular(&pool, 10).await.unwrap();
        assert_eq!(popular[0].id, guide.id);
        assert_eq!(popular[1].id, other.id);
        assert!(matches!(add_download(&pool, 999).await, Err(DbError::NotFound)));

        let updated = update_material(&pool, guide.id, &fields("nades v2", MaterialCategory::Guides))
            .await
            .unwrap();
        assert_eq!(updated.title, "nades v2");
        assert_eq!(updated.downloads, 2);
        assert!(delete_material(&pool, guide.id).await.unwrap());
        assert!(get_material(&pool, guide.id).await.unwrap().is_none());
    }
}
