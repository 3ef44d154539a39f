use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fraghub_core::portfolio::{PortfolioDetail, PortfolioInput};
use fraghub_core::AppState;
use fraghub_db::portfolio::{PortfolioFilter, PortfolioItemRow};
use fraghub_models::content::{PlayerRole, PortfolioItemType};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

fn item_to_json(p: &PortfolioItemRow) -> Value {
    json!({
        "id": p.id,
        "user_id": p.user_id,
        "author_username": p.author_username,
        "title": p.title,
        "description": p.description,
        "item_type": p.item_type,
        "file_url": p.file_url,
        "player_role": p.player_role,
        "game_map": p.game_map,
        "weapon": p.weapon,
        "is_approved": p.is_approved,
        "created_at": p.created_at.to_rfc3339(),
    })
}

fn items_json(items: &[PortfolioItemRow]) -> Vec<Value> {
    items.iter().map(item_to_json).collect()
}

fn detail_to_json(detail: &PortfolioDetail) -> Value {
    let mut value = item_to_json(&detail.item);
    value["more_by_user"] = json!(items_json(&detail.more_by_user));
    value["can_edit"] = json!(detail.can_edit);
    value
}

#[derive(Deserialize)]
pub struct PortfolioQuery {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub role: Option<String>,
    pub map: Option<String>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = PortfolioFilter {
        item_type: query
            .item_type
            .as_deref()
            .map(str::parse::<PortfolioItemType>)
            .transpose()?,
        player_role: query.role.as_deref().map(str::parse::<PlayerRole>).transpose()?,
        game_map: query.map.as_deref().map(str::trim).filter(|m| !m.is_empty()),
    };
    let items = fraghub_db::portfolio::list_approved(&state.db, &filter).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn list_user_items(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let viewer = auth.actor();
    let items = fraghub_core::portfolio::list_user_items(&state.db, user_id, viewer.as_ref()).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn moderation_queue(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let items = fraghub_core::portfolio::moderation_queue(&state.db, &auth.actor()).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn get_item(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let viewer = auth.actor();
    let detail = fraghub_core::portfolio::get_item(&state.db, item_id, viewer.as_ref()).await?;
    Ok(Json(detail_to_json(&detail)))
}

#[derive(Deserialize)]
pub struct PortfolioRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub item_type: PortfolioItemType,
    pub file_url: String,
    pub player_role: Option<PlayerRole>,
    #[serde(default)]
    pub game_map: String,
    #[serde(default)]
    pub weapon: String,
}

impl From<PortfolioRequest> for PortfolioInput {
    fn from(body: PortfolioRequest) -> Self {
        PortfolioInput {
            title: body.title,
            description: body.description,
            item_type: body.item_type,
            file_url: body.file_url,
            player_role: body.player_role,
            game_map: body.game_map,
            weapon: body.weapon,
        }
    }
}

pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PortfolioRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let item = fraghub_core::portfolio::create_item(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(item_to_json(&item))))
}

pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
    Json(body): Json<PortfolioRequest>,
) -> Result<Json<Value>, ApiError> {
    let item =
        fraghub_core::portfolio::update_item(&state.db, &auth.actor(), item_id, &body.into()).await?;
    Ok(Json(item_to_json(&item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::portfolio::delete_item(&state.db, &auth.actor(), item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let item = fraghub_core::portfolio::approve_item(&state.db, &auth.actor(), item_id).await?;
    Ok(Json(item_to_json(&item)))
}

pub async fn reject_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::portfolio::reject_item(&state.db, &auth.actor(), item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
