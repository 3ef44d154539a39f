use crate::error::CoreError;
use crate::permissions::{require_role, Actor};
use fraghub_db::materials::{MaterialFields, MaterialRow};
use fraghub_db::DbPool;
use fraghub_models::content::MaterialCategory;
use fraghub_models::role::Role;

const SIMILAR_LIMIT: i64 = 4;

#[derive(Debug, Clone)]
pub struct MaterialInput {
    pub title: String,
    pub description: String,
    pub category: MaterialCategory,
    pub file_url: Option<String>,
    pub link: Option<String>,
    pub youtube_embed: String,
}

/// Blank optional URLs count as absent.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require_http(value: Option<&str>, field: &str) -> Result<(), CoreError> {
    match value {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(CoreError::BadRequest(format!("{field} must be an http(s) URL")))
        }
        _ => Ok(()),
    }
}

impl MaterialInput {
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::BadRequest("title is required".into()));
        }
        require_http(non_blank(&self.file_url), "file_url")?;
        require_http(non_blank(&self.link), "link")?;
        Ok(())
    }

    fn fields(&self) -> MaterialFields<'_> {
        MaterialFields {
            title: self.title.trim(),
            description: &self.description,
            category: self.category,
            file_url: non_blank(&self.file_url),
            link: non_blank(&self.link),
            youtube_embed: self.youtube_embed.trim(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialDetail {
    pub material: MaterialRow,
    /// Newest other materials of the same category.
    pub similar: Vec<MaterialRow>,
}

pub async fn get_material(pool: &DbPool, material_id: i64) -> Result<MaterialDetail, CoreError> {
    let material = fraghub_db::materials::get_material(pool, material_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let similar =
        fraghub_db::materials::list_similar(pool, &material.category, material.id, SIMILAR_LIMIT).await?;
    Ok(MaterialDetail { material, similar })
}

/// Material count for every category, zeros included, in declaration order.
pub async fn category_counts(pool: &DbPool) -> Result<Vec<(MaterialCategory, i64)>, CoreError> {
    let counted = fraghub_db::materials::count_by_category(pool).await?;
    Ok(MaterialCategory::ALL
        .iter()
        .map(|category| {
            let count = counted
                .iter()
                .find(|(label, _)| label == category.as_str())
                .map_or(0, |(_, count)| *count);
            (*category, count)
        })
        .collect())
}

pub async fn create_material(
    pool: &DbPool,
    actor: &Actor,
    input: &MaterialInput,
) -> Result<MaterialRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    let material = fraghub_db::materials::create_material(pool, &input.fields()).await?;
    tracing::info!(material_id = material.id, by = actor.user_id, "material created");
    Ok(material)
}

pub async fn update_material(
    pool: &DbPool,
    actor: &Actor,
    material_id: i64,
    input: &MaterialInput,
) -> Result<MaterialRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    Ok(fraghub_db::materials::update_material(pool, material_id, &input.fields()).await?)
}

pub async fn delete_material(pool: &DbPool, actor: &Actor, material_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::materials::delete_material(pool, material_id).await? {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

/// Where to fetch a material's file, after counting the download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_url: String,
    pub downloads: i64,
}

/// Materials without a file are not downloadable and are not counted.
pub async fn download(pool: &DbPool, material_id: i64) -> Result<Download, CoreError> {
    let material = fraghub_db::materials::get_material(pool, material_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let file_url = material.file_url.ok_or(CoreError::NotFound)?;
    let downloads = fraghub_db::materials::add_download(pool, material_id).await?;
    tracing::debug!(material_id, downloads, "material downloaded");
    Ok(Download { file_url, downloads })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};

    fn input(title: &str, file_url: Option<&str>) -> MaterialInput {
        MaterialInput {
            title: title.into(),
            description: "Pro settings".into(),
            category: MaterialCategory::Configs,
            file_url: file_url.map(str::to_string),
            link: None,
            youtube_embed: String::new(),
        }
    }

    #[tokio::test]
    async fn only_moderators_manage_materials() {
        let pool = test_pool().await;
        let user = actor(&pool, "user", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let cfg = input("autoexec", Some("https://cdn.example.com/autoexec.cfg"));

        assert!(matches!(create_material(&pool, &user, &cfg).await, Err(CoreError::Forbidden)));
        let material = create_material(&pool, &moderator, &cfg).await.unwrap();
        assert!(matches!(
            update_material(&pool, &user, material.id, &cfg).await,
            Err(CoreError::Forbidden)
        ));
        delete_material(&pool, &moderator, material.id).await.unwrap();
        assert!(matches!(
            delete_material(&pool, &moderator, material.id).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn blank_urls_are_stored_as_absent_and_bad_urls_rejected() {
        let pool = test_pool().await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;

        let mut guide = input("smokes", Some("  "));
        guide.link = Some("https://example.com/smokes".into());
        let material = create_material(&pool, &moderator, &guide).await.unwrap();
        assert!(material.file_url.is_none());
        assert_eq!(material.link.as_deref(), Some("https://example.com/smokes"));

        let bad = input("bad", Some("file:///etc/passwd"));
        assert!(matches!(
            create_material(&pool, &moderator, &bad).await,
            Err(CoreError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn download_counts_only_materials_with_a_file() {
        let pool = test_pool().await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let cfg = create_material(&pool, &moderator, &input("cfg", Some("https://cdn.example.com/a.cfg")))
            .await
            .unwrap();
        let linkless = create_material(&pool, &moderator, &input("notes", None)).await.unwrap();

        let first = download(&pool, cfg.id).await.unwrap();
        assert_eq!(first.file_url, "https://cdn.example.com/a.cfg");
        assert_eq!(first.downloads, 1);
        assert_eq!(download(&pool, cfg.id).await.unwrap().downloads, 2);

        assert!(matches!(download(&pool, linkless.id).await, Err(CoreError::NotFound)));
        assert_eq!(get_material(&pool, linkless.id).await.unwrap().material.downloads, 0);
        assert!(matches!(download(&pool, 999).await, Err(CoreError::NotFound)));
    }

    #[tokio::test]
    async fn detail_lists_similar_and_counts_cover_every_category() {
        let pool = test_pool().await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let a = create_material(&pool, &moderator, &input("a", None)).await.unwrap();
        let b = create_material(&pool, &moderator, &input("b", None)).await.unwrap();

        let detail = get_material(&pool, a.id).await.unwrap();
        assert_eq!(detail.similar.len(), 1);
        assert_eq!(detail.similar[0].id, b.id);

        let counts = category_counts(&pool).await.unwrap();
        assert_eq!(counts.len(), MaterialCategory::ALL.len());
        assert_eq!(counts[0], (MaterialCategory::Configs, 2));
        assert!(counts[1..].iter().all(|(_, count)| *count == 0));
    }
}
