use crate::error::CoreError;
use crate::permissions::{require_owner_or_role, require_role, Actor};
use fraghub_db::portfolio::{PortfolioFields, PortfolioItemRow};
use fraghub_db::DbPool;
use fraghub_models::content::{PlayerRole, PortfolioItemType};
use fraghub_models::role::Role;

const MORE_BY_USER_LIMIT: i64 = 4;

#[derive(Debug, Clone)]
pub struct PortfolioInput {
    pub title: String,
    pub description: String,
    pub item_type: PortfolioItemType,
    pub file_url: String,
    pub player_role: Option<PlayerRole>,
    pub game_map: String,
    pub weapon: String,
}

impl PortfolioInput {
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::BadRequest("title is required".into()));
        }
        let url = self.file_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::BadRequest("file_url must be an http(s) URL".into()));
        }
        Ok(())
    }

    fn fields(&self) -> PortfolioFields<'_> {
        PortfolioFields {
            title: self.title.trim(),
            description: &self.description,
            item_type: self.item_type,
            file_url: self.file_url.trim(),
            player_role: self.player_role,
            game_map: self.game_map.trim(),
            weapon: self.weapon.trim(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioDetail {
    pub item: PortfolioItemRow,
    /// Other approved items by the same player.
    pub more_by_user: Vec<PortfolioItemRow>,
    pub can_edit: bool,
}

async fn load_item(pool: &DbPool, item_id: i64) -> Result<PortfolioItemRow, CoreError> {
    fraghub_db::portfolio::get_item(pool, item_id)
        .await?
        .ok_or(CoreError::NotFound)
}

fn can_manage(viewer: Option<&Actor>, owner_id: i64) -> bool {
    viewer.is_some_and(|actor| actor.user_id == owner_id || actor.is_moderator())
}

/// Unapproved items are visible only to their owner and moderators.
pub async fn get_item(
    pool: &DbPool,
    item_id: i64,
    viewer: Option<&Actor>,
) -> Result<PortfolioDetail, CoreError> {
    let item = load_item(pool, item_id).await?;
    let can_edit = can_manage(viewer, item.user_id);
    if !item.is_approved && !can_edit {
        return Err(CoreError::NotFound);
    }
    let more_by_user =
        fraghub_db::portfolio::list_more_by_user(pool, item.user_id, item.id, MORE_BY_USER_LIMIT).await?;
    Ok(PortfolioDetail {
        item,
        more_by_user,
        can_edit,
    })
}

/// Items from moderators are published immediately; others wait for review.
pub async fn create_item(
    pool: &DbPool,
    actor: &Actor,
    input: &PortfolioInput,
) -> Result<PortfolioItemRow, CoreError> {
    input.validate()?;
    let item =
        fraghub_db::portfolio::create_item(pool, actor.user_id, &input.fields(), actor.is_moderator()).await?;
    tracing::info!(item_id = item.id, approved = item.is_approved, "portfolio item created");
    Ok(item)
}

/// Edits by anyone but a moderator send the item back to the moderation queue.
pub async fn update_item(
    pool: &DbPool,
    actor: &Actor,
    item_id: i64,
    input: &PortfolioInput,
) -> Result<PortfolioItemRow, CoreError> {
    let item = load_item(pool, item_id).await?;
    require_owner_or_role(actor, item.user_id, Role::Moderator)?;
    input.validate()?;
    let approved = actor.is_moderator() && item.is_approved;
    Ok(fraghub_db::portfolio::update_item(pool, item_id, &input.fields(), approved).await?)
}

pub async fn delete_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<(), CoreError> {
    let item = load_item(pool, item_id).await?;
    require_owner_or_role(actor, item.user_id, Role::Moderator)?;
    fraghub_db::portfolio::delete_item(pool, item_id).await?;
    Ok(())
}

pub async fn moderation_queue(pool: &DbPool, actor: &Actor) -> Result<Vec<PortfolioItemRow>, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::portfolio::list_pending(pool).await?)
}

pub async fn approve_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<PortfolioItemRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    fraghub_db::portfolio::set_approved(pool, item_id, true).await?;
    tracing::info!(item_id, by = actor.user_id, "portfolio item approved");
    load_item(pool, item_id).await
}

/// Rejection removes the item.
pub async fn reject_item(pool: &DbPool, actor: &Actor, item_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::portfolio::delete_item(pool, item_id).await? {
        return Err(CoreError::NotFound);
    }
    tracing::info!(item_id, by = actor.user_id, "portfolio item rejected");
    Ok(())
}

pub async fn list_user_items(
    pool: &DbPool,
    user_id: i64,
    viewer: Option<&Actor>,
) -> Result<Vec<PortfolioItemRow>, CoreError> {
    fraghub_db::users::get_user_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let include_unapproved = can_manage(viewer, user_id);
    Ok(fraghub_db::portfolio::list_by_user(pool, user_id, include_unapproved).await?)
}
