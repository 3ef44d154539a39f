use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fraghub_core::events::EventInput;
use fraghub_core::AppState;
use fraghub_db::events::EventRow;
use fraghub_models::content::EventType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

const UPCOMING_LIMIT: i64 = 20;

pub(crate) fn event_to_json(e: &EventRow) -> Value {
    json!({
        "id": e.id,
        "title": e.title,
        "description": e.description,
        "event_type": e.event_type,
        "starts_at": e.starts_at.to_rfc3339(),
        "ends_at": e.ends_at.map(|d| d.to_rfc3339()),
        "location": e.location,
        "image_url": e.image_url,
        "is_active": e.is_active,
        "created_at": e.created_at.to_rfc3339(),
    })
}

fn events_json(events: &[EventRow]) -> Vec<Value> {
    events.iter().map(event_to_json).collect()
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Value>, ApiError> {
    let event_type = query
        .event_type
        .as_deref()
        .map(str::parse::<EventType>)
        .transpose()?;
    let events = fraghub_db::events::list_active(&state.db, event_type).await?;
    Ok(Json(json!({ "events": events_json(&events) })))
}

pub async fn list_upcoming(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let events = fraghub_db::events::list_upcoming(&state.db, Utc::now(), UPCOMING_LIMIT).await?;
    Ok(Json(json!({ "events": events_json(&events) })))
}

pub async fn list_past(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let events = fraghub_db::events::list_past(&state.db, Utc::now()).await?;
    Ok(Json(json!({ "events": events_json(&events) })))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let event = fraghub_db::events::get_event(&state.db, event_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(event_to_json(&event)))
}

#[derive(Deserialize)]
pub struct EventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_type: EventType,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: String,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<EventRequest> for EventInput {
    fn from(body: EventRequest) -> Self {
        EventInput {
            title: body.title,
            description: body.description,
            event_type: body.event_type,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            location: body.location,
            image_url: body.image_url,
            is_active: body.is_active,
        }
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<EventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let event = fraghub_core::events::create_event(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(event_to_json(&event))))
}

pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
    Json(body): Json<EventRequest>,
) -> Result<Json<Value>, ApiError> {
    let event =
        fraghub_core::events::update_event(&state.db, &auth.actor(), event_id, &body.into()).await?;
    Ok(Json(event_to_json(&event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::events::delete_event(&state.db, &auth.actor(), event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
