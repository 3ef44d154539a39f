use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::content::{PlayerRole, PortfolioItemType};

const ITEM_SELECT: &str = "SELECT p.id, p.user_id, u.username AS author_username, p.title, p.description,
        p.item_type, p.file_url, p.player_role, p.game_map, p.weapon, p.is_approved, p.created_at
    FROM portfolio_items p
    JOIN users u ON u.id = p.user_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PortfolioItemRow {
    pub id: i64,
    pub user_id: i64,
    pub author_username: String,
    pub title: String,
    pub description: String,
    pub item_type: String,
    pub file_url: String,
    pub player_role: Option<String>,
    pub game_map: String,
    pub weapon: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Writable portfolio fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct PortfolioFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub item_type: PortfolioItemType,
    pub file_url: &'a str,
    pub player_role: Option<PlayerRole>,
    pub game_map: &'a str,
    pub weapon: &'a str,
}

/// Narrows the public listing; `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct PortfolioFilter<'a> {
    pub item_type: Option<PortfolioItemType>,
    pub player_role: Option<PlayerRole>,
    /// Case-insensitive substring of the map name.
    pub game_map: Option<&'a str>,
}

pub async fn create_item(
    pool: &DbPool,
    user_id: i64,
    fields: &PortfolioFields<'_>,
    is_approved: bool,
) -> Result<PortfolioItemRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO portfolio_items
             (user_id, title, description, item_type, file_url, player_role, game_map, weapon, is_approved)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         RETURNING id",
    )
    .bind(user_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.item_type.as_str())
    .bind(fields.file_url)
    .bind(fields.player_role.map(PlayerRole::as_str))
    .bind(fields.game_map)
    .bind(fields.weapon)
    .bind(is_approved)
    .fetch_one(pool)
    .await?;
    get_item(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn get_item(pool: &DbPool, id: i64) -> Result<Option<PortfolioItemRow>, DbError> {
    let sql = format!("{ITEM_SELECT} WHERE p.id = ?1");
    let row = sqlx::query_as::<_, PortfolioItemRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Replaces the editable fields and sets the approval flag as decided by the caller.
pub async fn update_item(
    pool: &DbPool,
    id: i64,
    fields: &PortfolioFields<'_>,
    is_approved: bool,
) -> Result<PortfolioItemRow, DbError> {
    let result = sqlx::query(
        "UPDATE portfolio_items
         SET title = ?2, description = ?3, item_type = ?4, file_url = ?5, player_role = ?6,
             game_map = ?7, weapon = ?8, is_approved = ?9
         WHERE id = ?1",
    )
    .bind(id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.item_type.as_str())
    .bind(fields.file_url)
    .bind(fields.player_role.map(PlayerRole::as_str))
    .bind(fields.game_map)
    .bind(fields.weapon)
    .bind(is_approved)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_item(pool, id).await?.ok_or(DbError::NotFound)
}

pub async fn delete_item(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM portfolio_items WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_approved(pool: &DbPool, id: i64, approved: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE portfolio_items SET is_approved = ?2 WHERE id = ?1")
        .bind(id)
        .bind(approved)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Approved items, newest first.
pub async fn list_approved(
    pool: &DbPool,
    filter: &PortfolioFilter<'_>,
) -> Result<Vec<PortfolioItemRow>, DbError> {
    let sql = format!(
        "{ITEM_SELECT}
         WHERE p.is_approved = 1
           AND (?1 IS NULL OR p.item_type = ?1)
           AND (?2 IS NULL OR p.player_role = ?2)
           AND (?3 IS NULL OR instr(lower(p.game_map), lower(?3)) > 0)
         ORDER BY p.created_at DESC, p.id DESC"
    );
    let rows = sqlx::query_as::<_, PortfolioItemRow>(&sql)
        .bind(filter.item_type.map(PortfolioItemType::as_str))
        .bind(filter.player_role.map(PlayerRole::as_str))
        .bind(filter.game_map)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Moderation queue, newest first.
pub async fn list_pending(pool: &DbPool) -> Result<Vec<PortfolioItemRow>, DbError> {
    let sql = format!("{ITEM_SELECT} WHERE p.is_approved = 0 ORDER BY p.created_at DESC, p.id DESC");
    let rows = sqlx::query_as::<_, PortfolioItemRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn list_by_user(
    pool: &DbPool,
    user_id: i64,
    include_unapproved: bool,
) -> Result<Vec<PortfolioItemRow>, DbError> {
    let sql = format!(
        "{ITEM_SELECT} WHERE p.user_id = ?1 AND (?2 OR p.is_approved = 1)
         ORDER BY p.created_at DESC, p.id DESC"
    );
    let rows = sqlx::query_as::<_, PortfolioItemRow>(&sql)
        .bind(user_id)
        .bind(include_unapproved)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Other approved items by the same user, newest first.
pub async fn list_more_by_user(
    pool: &DbPool,
    user_id: i64,
    exclude_id: i64,
    limit: i64,
) -> Result<Vec<PortfolioItemRow>, DbError> {
    let sql = format!(
        "{ITEM_SELECT} WHERE p.user_id = ?1 AND p.id != ?2 AND p.is_approved = 1
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?3"
    );
    let rows = sqlx::query_as::<_, PortfolioItemRow>(&sql)
        .bind(user_id)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_pool, user};

    fn fields<'a>(title: &'a str, game_map: &'a str, player_role: Option<PlayerRole>) -> PortfolioFields<'a> {
        PortfolioFields {
            title,
            description: "",
            item_type: PortfolioItemType::Highlight,
            file_url: "https://cdn.example.com/ace.mp4",
            player_role,
            game_map,
            weapon: "AK-47",
        }
    }

    #[tokio::test]
    async fn filters_apply_only_to_approved_items() {
        let pool = test_pool().await;
        let owner = user(&pool, "owner").await;
        create_item(&pool, owner, &fields("ace", "de_Mirage", Some(PlayerRole::Awper)), true)
            .await
            .unwrap();
        create_item(&pool, owner, &fields("clutch", "de_inferno", Some(PlayerRole::Igl)), true)
            .await
            .unwrap();
        let pending = create_item(&pool, owner, &fields("1v5", "de_mirage", Some(PlayerRole::Awper)), false)
            .await
            .unwrap();

        assert_eq!(list_approved(&pool, &PortfolioFilter::default()).await.unwrap().len(), 2);
        let mirage = PortfolioFilter { game_map: Some("MIRAGE"), ..Default::default() };
        assert_eq!(list_approved(&pool, &mirage).await.unwrap().len(), 1);
        let igl = PortfolioFilter { player_role: Some(PlayerRole::Igl), ..Default::default() };
        assert_eq!(list_approved(&pool, &igl).await.unwrap()[0].title, "clutch");
        let demos = PortfolioFilter { item_type: Some(PortfolioItemType::Demo), ..Default::default() };
        assert!(list_approved(&pool, &demos).await.unwrap().is_empty());

        assert_eq!(list_pending(&pool).await.unwrap()[0].id, pending.id);
        assert_eq!(list_by_user(&pool, owner, false).await.unwrap().len(), 2);
        assert_eq!(list_by_user(&pool, owner, true).await.unwrap().len(), 3);
        assert_eq!(list_more_by_user(&pool, owner, pending.id, 4).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_sets_approval_and_clears_role() {
        let pool = test_pool().await;
        let owner = user(&pool, "owner").await;
        let item = create_item(&pool, owner, &fields("a", "de_nuke", Some(PlayerRole::Entry)), true)
            .await
            .unwrap();
        assert_eq!(item.player_role.as_deref(), Some("entry"));

        let updated = update_item(&pool, item.id, &fields("b", "de_nuke", None), false)
            .await
            .unwrap();
        assert_eq!(updated.title, "b");
        assert!(updated.player_role.is_none());
        assert!(!updated.is_approved);

        set_approved(&pool, item.id, true).await.unwrap();
        assert!(get_item(&pool, item.id).await.unwrap().unwrap().is_approved);
        assert!(delete_item(&pool, item.id).await.unwrap());
        assert!(matches!(set_approved(&pool, item.id, true).await, Err(DbError::NotFound)));
    }
}
