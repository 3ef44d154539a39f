use crate::error::CoreError;
use crate::permissions::{require_role, Actor};
use fraghub_db::announcements::AnnouncementRow;
use fraghub_db::DbPool;
use fraghub_models::content::AnnouncementType;
use fraghub_models::role::Role;

#[derive(Debug, Clone)]
pub struct AnnouncementInput {
    pub title: String,
    pub content: String,
    pub announcement_type: AnnouncementType,
    pub is_pinned: bool,
}

impl AnnouncementInput {
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(CoreError::BadRequest("title and content are required".into()));
        }
        Ok(())
    }
}

pub async fn create_announcement(
    pool: &DbPool,
    actor: &Actor,
    input: &AnnouncementInput,
) -> Result<AnnouncementRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    let announcement = fraghub_db::announcements::create_announcement(
        pool,
        actor.user_id,
        input.title.trim(),
        input.content.trim(),
        input.announcement_type,
        input.is_pinned,
    )
    .await?;
    tracing::info!(announcement_id = announcement.id, by = actor.user_id, "announcement published");
    Ok(announcement)
}

pub async fn update_announcement(
    pool: &DbPool,
    actor: &Actor,
    announcement_id: i64,
    input: &AnnouncementInput,
) -> Result<AnnouncementRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    Ok(fraghub_db::announcements::update_announcement(
        pool,
        announcement_id,
        input.title.trim(),
        input.content.trim(),
        input.announcement_type,
        input.is_pinned,
    )
    .await?)
}

pub async fn delete_announcement(pool: &DbPool, actor: &Actor, announcement_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::announcements::delete_announcement(pool, announcement_id).await? {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

pub async fn toggle_pin(pool: &DbPool, actor: &Actor, announcement_id: i64) -> Result<bool, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::announcements::toggle_pin(pool, announcement_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};

    #[tokio::test]
    async fn publishing_requires_moderator() {
        let pool = test_pool().await;
        let user = actor(&pool, "user", Role::User).await;
        let admin = actor(&pool, "admin", Role::Admin).await;
        let input = AnnouncementInput {
            title: "Server restart".into(),
            content: "Tonight at 03:00".into(),
            announcement_type: AnnouncementType::Server,
            is_pinned: false,
        };

        assert!(matches!(
            create_announcement(&pool, &user, &input).await,
            Err(CoreError::Forbidden)
        ));
        let published = create_announcement(&pool, &admin, &input).await.unwrap();
        assert_eq!(published.author_username, "admin");
        assert!(toggle_pin(&pool, &admin, published.id).await.unwrap());
        assert!(matches!(toggle_pin(&pool, &user, published.id).await, Err(CoreError::Forbidden)));
        delete_announcement(&pool, &admin, published.id).await.unwrap();
        assert!(matches!(
            update_announcement(&pool, &admin, published.id, &input).await,
            Err(CoreError::NotFound)
        ));
    }
}
