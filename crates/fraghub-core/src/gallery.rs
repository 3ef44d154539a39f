use crate::error::CoreError;
use crate::permissions::{require_owner_or_role, require_role, Actor};
use fraghub_db::gallery::MediaItemRow;
use fraghub_db::DbPool;
use fraghub_models::content::GalleryMediaType;
use fraghub_models::role::Role;

#[derive(Debug, Clone)]
pub struct MediaInput {
    pub title: String,
    pub media_url: String,
    pub media_type: GalleryMediaType,
    pub description: String,
}

impl MediaInput {
    fn validate(&self) -> Result<(), CoreError> {
        let url = self.media_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::BadRequest("media_url must be an http(s) URL".into()));
        }
        Ok(())
    }
}

async fn load_item(pool: &DbPool, item_id: i64) -> Result<MediaItemRow, CoreError> {
    fraghub_db::gallery::get_item(pool, item_id)
        .await?
        .ok_or(CoreError::NotFound)
}

/// Unapproved items are visible only to their owner and moderators.
pub async fn get_item(pool: &DbPool, item_id: i64, viewer: Option<&Actor>) -> Result<MediaItemRow, CoreError> {
    let item = load_item(pool, item_id).await?;
    if item.is_approved {
        return Ok(item);
    }
    match viewer {
        Some(actor) if actor.user_id == item.user_id || actor.is_moderator() => Ok(item),
        _ => Err(CoreError::NotFound),
    }
}

/// Items from moderators are published immediately; others wait for review.
pub async fn create_item(pool: &DbPool, actor: &Actor, input: &MediaInput) -> Result<MediaItemRow, CoreError> {
    input.validate()?;
    let item = fraghub_db::gallery::create_item(
        pool,
        actor.user_id,
        input.title.trim(),
        input.media_url.trim(),
        input.media_type,
        &input.description,
        actor.is_moderator(),
    )
    .await?;
    tracing::info!(item_id = item.id, approved = item.is_approved, "gallery item created");
    Ok(item)
}

/// Edits by anyone but a moderator send the item back to the moderation queue.
pub async fn update_item(
    pool: &DbPool,
    actor: &Actor,
    item_id: i64,
    input: &MediaInput,
) -> Result<MediaItemRow, CoreError> {
    let item = load_item(pool, item_id).await?;
    require_owner_or_role(actor, item.user_id, Role::Moderator)?;
    input.validate()?;
    let approved = actor.is_moderator() && item.is_approved;
    Ok(fraghub_db::gallery::update_item(
        pool,
        item_id,
        input.title.trim(),
        input.media_url.trim(),
        input.media_type,
        &input.description,
        approved,
    )
    .await?)
}

pub async fn delete_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<(), CoreError> {
    let item = load_item(pool, item_id).await?;
    require_owner_or_role(actor, item.user_id, Role::Moderator)?;
    fraghub_db::gallery::delete_item(pool, item_id).await?;
    Ok(())
}

/// Returns the new like count. Items the actor cannot see cannot be liked.
pub async fn like_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<i64, CoreError> {
    get_item(pool, item_id, Some(actor)).await?;
    Ok(fraghub_db::gallery::add_like(pool, item_id).await?)
}

pub async fn moderation_queue(pool: &DbPool, actor: &Actor) -> Result<Vec<MediaItemRow>, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::gallery::list_pending(pool).await?)
}

pub async fn approve_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<MediaItemRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    fraghub_db::gallery::set_approved(pool, item_id, true).await?;
    tracing::info!(item_id, by = actor.user_id, "gallery item approved");
    load_item(pool, item_id).await
}

/// Rejection removes the item.
pub async fn reject_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::gallery::delete_item(pool, item_id).await? {
        return Err(CoreError::NotFound);
    }
    tracing::info!(item_id, by = actor.user_id, "gallery item rejected");
    Ok(())
}

pub async fn list_user_items(
    pool: &DbPool,
    user_id: i64,
    viewer: Option<&Actor>,
) -> Result<Vec<MediaItemRow>, CoreError> {
    fraghub_db::users::get_user_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let include_unapproved =
        viewer.is_some_and(|actor| actor.user_id == user_id || actor.is_moderator());
    Ok(fraghub_db::gallery::list_by_user(pool, user_id, include_unapproved).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};

    fn input(title: &str) -> MediaInput {
        MediaInput {
            title: title.into(),
            media_url: "https://cdn.example.com/shot.png".into(),
            media_type: GalleryMediaType::Screenshot,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn moderator_uploads_skip_the_queue() {
        let pool = test_pool().await;
        let user = actor(&pool, "user", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;

        let pending = create_item(&pool, &user, &input("mine")).await.unwrap();
        let published = create_item(&pool, &moderator, &input("official")).await.unwrap();
        assert!(!pending.is_approved);
        assert!(published.is_approved);

        let queue = moderation_queue(&pool, &moderator).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(matches!(moderation_queue(&pool, &user).await, Err(CoreError::Forbidden)));
        assert!(approve_item(&pool, &moderator, pending.id).await.unwrap().is_approved);
    }

    #[tokio::test]
    async fn owner_edit_resets_approval() {
        let pool = test_pool().await;
        let user = actor(&pool, "user", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let item = create_item(&pool, &user, &input("v1")).await.unwrap();
        approve_item(&pool, &moderator, item.id).await.unwrap();

        let edited = update_item(&pool, &user, item.id, &input("v2")).await.unwrap();
        assert!(!edited.is_approved);
        approve_item(&pool, &moderator, item.id).await.unwrap();
        let by_mod = update_item(&pool, &moderator, item.id, &input("v3")).await.unwrap();
        assert!(by_mod.is_approved);
    }

    #[tokio::test]
    async fn unapproved_items_are_hidden_from_strangers() {
        let pool = test_pool().await;
        let owner = actor(&pool, "owner", Role::User).await;
        let stranger = actor(&pool, "stranger", Role::User).await;
        let item = create_item(&pool, &owner, &input("hidden")).await.unwrap();

        assert!(get_item(&pool, item.id, Some(&owner)).await.is_ok());
        assert!(matches!(get_item(&pool, item.id, Some(&stranger)).await, Err(CoreError::NotFound)));
        assert!(matches!(get_item(&pool, item.id, None).await, Err(CoreError::NotFound)));
        assert_eq!(list_user_items(&pool, owner.user_id, Some(&owner)).await.unwrap().len(), 1);
        assert!(list_user_items(&pool, owner.user_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn likes_and_rejection() {
        let pool = test_pool().await;
        let owner = actor(&pool, "owner", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let item = create_item(&pool, &owner, &input("meme")).await.unwrap();

        assert_eq!(like_item(&pool, &owner, item.id).await.unwrap(), 1);
        assert_eq!(like_item(&pool, &moderator, item.id).await.unwrap(), 2);
        reject_item(&pool, &moderator, item.id).await.unwrap();
        assert!(matches!(like_item(&pool, &owner, item.id).await, Err(CoreError::NotFound)));

        let mut bad = input("bad");
        bad.media_url = "ftp://nope".into();
        assert!(matches!(create_item(&pool, &owner, &bad).await, Err(CoreError::BadRequest(_))));
    }

    #[tokio::test]
    async fn pending_items_cannot_be_liked_by_strangers() {
        let pool = test_pool().await;
        let owner = actor(&pool, "owner", Role::User).await;
        let stranger = actor(&pool, "stranger", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let item = create_item(&pool, &owner, &input("pending")).await.unwrap();

        assert!(matches!(like_item(&pool, &stranger, item.id).await, Err(CoreError::NotFound)));
        assert_eq!(load_item(&pool, item.id).await.unwrap().likes, 0);

        approve_item(&pool, &moderator, item.id).await.unwrap();
        assert_eq!(like_item(&pool, &stranger, item.id).await.unwrap(), 1);
    }
}
