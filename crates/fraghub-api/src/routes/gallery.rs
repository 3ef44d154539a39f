use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fraghub_core::gallery::MediaInput;
use fraghub_core::AppState;
use fraghub_db::gallery::MediaItemRow;
use fraghub_models::content::GalleryMediaType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

const POPULAR_LIMIT: i64 = 12;

fn item_to_json(g: &MediaItemRow) -> Value {
    json!({
        "id": g.id,
        "user_id": g.user_id,
        "author_username": g.author_username,
        "title": g.title,
        "media_url": g.media_url,
        "media_type": g.media_type,
        "description": g.description,
        "is_approved": g.is_approved,
        "likes": g.likes,
        "created_at": g.created_at.to_rfc3339(),
    })
}

fn items_json(items: &[MediaItemRow]) -> Vec<Value> {
    items.iter().map(item_to_json).collect()
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Value>, ApiError> {
    let media_type = query
        .media_type
        .as_deref()
        .map(str::parse::<GalleryMediaType>)
        .transpose()?;
    let items = fraghub_db::gallery::list_approved(&state.db, media_type).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn list_popular(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = fraghub_db::gallery::list_popular(&state.db, POPULAR_LIMIT).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn list_user_items(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let viewer = auth.actor();
    let items = fraghub_core::gallery::list_user_items(&state.db, user_id, viewer.as_ref()).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn moderation_queue(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let items = fraghub_core::gallery::moderation_queue(&state.db, &auth.actor()).await?;
    Ok(Json(json!({ "items": items_json(&items) })))
}

pub async fn get_item(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let viewer = auth.actor();
    let item = fraghub_core::gallery::get_item(&state.db, item_id, viewer.as_ref()).await?;
    Ok(Json(item_to_json(&item)))
}

#[derive(Deserialize)]
pub struct MediaRequest {
    #[serde(default)]
    pub title: String,
    pub media_url: String,
    pub media_type: GalleryMediaType,
    #[serde(default)]
    pub description: String,
}

impl From<MediaRequest> for MediaInput {
    fn from(body: MediaRequest) -> Self {
        MediaInput {
            title: body.title,
            media_url: body.media_url,
            media_type: body.media_type,
            description: body.description,
        }
    }
}

pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MediaRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let item = fraghub_core::gallery::create_item(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(item_to_json(&item))))
}

pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
    Json(body): Json<MediaRequest>,
) -> Result<Json<Value>, ApiError> {
    let item =
        fraghub_core::gallery::update_item(&state.db, &auth.actor(), item_id, &body.into()).await?;
    Ok(Json(item_to_json(&item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::gallery::delete_item(&state.db, &auth.actor(), item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let likes = fraghub_core::gallery::like_item(&state.db, &auth.actor(), item_id).await?;
    Ok(Json(json!({ "likes": likes })))
}

pub async fn approve_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let item = fraghub_core::gallery::approve_item(&state.db, &auth.actor(), item_id).await?;
    Ok(Json(item_to_json(&item)))
}

pub async fn reject_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::gallery::reject_item(&state.db, &auth.actor(), item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
