use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fraghub_core::announcements::AnnouncementInput;
use fraghub_core::AppState;
use fraghub_db::announcements::AnnouncementRow;
use fraghub_models::content::AnnouncementType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub(crate) fn announcement_to_json(a: &AnnouncementRow) -> Value {
    json!({
        "id": a.id,
        "title": a.title,
        "content": a.content,
        "author_id": a.author_id,
        "author_username": a.author_username,
        "announcement_type": a.announcement_type,
        "is_pinned": a.is_pinned,
        "created_at": a.created_at.to_rfc3339(),
        "updated_at": a.updated_at.to_rfc3339(),
    })
}

fn announcements_json(rows: &[AnnouncementRow]) -> Vec<Value> {
    rows.iter().map(announcement_to_json).collect()
}

pub async fn list_announcements(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pinned = fraghub_db::announcements::list_announcements(&state.db, true, -1).await?;
    let others = fraghub_db::announcements::list_announcements(&state.db, false, -1).await?;
    Ok(Json(json!({
        "pinned": announcements_json(&pinned),
        "announcements": announcements_json(&others),
    })))
}

pub async fn list_by_type(
    State(state): State<AppState>,
    Path(announcement_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let announcement_type: AnnouncementType = announcement_type.parse()?;
    let rows = fraghub_db::announcements::list_by_type(&state.db, announcement_type).await?;
    Ok(Json(json!({
        "announcement_type": announcement_type,
        "announcements": announcements_json(&rows),
    })))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let announcement = fraghub_db::announcements::get_announcement(&state.db, announcement_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(announcement_to_json(&announcement)))
}

#[derive(Deserialize)]
pub struct AnnouncementRequest {
    pub title: String,
    pub content: String,
    pub announcement_type: AnnouncementType,
    #[serde(default)]
    pub is_pinned: bool,
}

impl From<AnnouncementRequest> for AnnouncementInput {
    fn from(body: AnnouncementRequest) -> Self {
        AnnouncementInput {
            title: body.title,
            content: body.content,
            announcement_type: body.announcement_type,
            is_pinned: body.is_pinned,
        }
    }
}

pub async fn create_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AnnouncementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let announcement =
        fraghub_core::announcements::create_announcement(&state.db, &auth.actor(), &body.into())
            .await?;
    Ok((StatusCode::CREATED, Json(announcement_to_json(&announcement))))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(announcement_id): Path<i64>,
    Json(body): Json<AnnouncementRequest>,
) -> Result<Json<Value>, ApiError> {
    let announcement = fraghub_core::announcements::update_announcement(
        &state.db,
        &auth.actor(),
        announcement_id,
        &body.into(),
    )
    .await?;
    Ok(Json(announcement_to_json(&announcement)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(announcement_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::announcements::delete_announcement(&state.db, &auth.actor(), announcement_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(announcement_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_pinned =
        fraghub_core::announcements::toggle_pin(&state.db, &auth.actor(), announcement_id).await?;
    Ok(Json(json!({ "is_pinned": is_pinned })))
}
