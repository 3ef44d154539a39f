use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fraghub_core::AppState;
use fraghub_db::forum::{CategoryRow, MessageRow, TopicRow};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

fn category_to_json(c: &CategoryRow) -> Value {
    json!({
        "id": c.id,
        "name": c.name,
        "description": c.description,
        "icon": c.icon,
        "topic_count": c.topic_count,
    })
}

fn topic_to_json(t: &TopicRow) -> Value {
    json!({
        "id": t.id,
        "category_id": t.category_id,
        "category_name": t.category_name,
        "title": t.title,
        "content": t.content,
        "created_by": t.created_by,
        "author_username": t.author_username,
        "is_pinned": t.is_pinned,
        "is_closed": t.is_closed,
        "message_count": t.message_count,
        "created_at": t.created_at.to_rfc3339(),
        "updated_at": t.updated_at.to_rfc3339(),
    })
}

fn message_to_json(m: &MessageRow) -> Value {
    json!({
        "id": m.id,
        "topic_id": m.topic_id,
        "author_id": m.author_id,
        "author_username": m.author_username,
        "text": m.text,
        "created_at": m.created_at.to_rfc3339(),
        "updated_at": m.updated_at.to_rfc3339(),
    })
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let categories = fraghub_db::forum::list_categories(&state.db).await?;
    let categories: Vec<Value> = categories.iter().map(category_to_json).collect();
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Deserialize)]
pub struct TopicsQuery {
    pub category: Option<i64>,
}

pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> Result<Json<Value>, ApiError> {
    let category = match query.category {
        Some(id) => Some(
            fraghub_db::forum::get_category(&state.db, id)
                .await?
                .ok_or(ApiError::NotFound)?,
        ),
        None => None,
    };
    let topics = fraghub_db::forum::list_topics(&state.db, query.category).await?;
    let topics: Vec<Value> = topics.iter().map(topic_to_json).collect();
    Ok(Json(json!({
        "category": category.as_ref().map(category_to_json),
        "topics": topics,
    })))
}

pub async fn get_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let detail = fraghub_core::forum::get_topic_detail(&state.db, topic_id).await?;
    let messages: Vec<Value> = detail.messages.iter().map(message_to_json).collect();
    Ok(Json(json!({
        "topic": topic_to_json(&detail.topic),
        "messages": messages,
    })))
}

#[derive(Deserialize)]
pub struct TopicRequest {
    pub category_id: i64,
    pub title: String,
    pub content: String,
}

pub async fn create_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TopicRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let topic = fraghub_core::forum::create_topic(
        &state.db,
        &auth.actor(),
        body.category_id,
        &body.title,
        &body.content,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(topic_to_json(&topic))))
}

pub async fn update_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
    Json(body): Json<TopicRequest>,
) -> Result<Json<Value>, ApiError> {
    let topic = fraghub_core::forum::update_topic(
        &state.db,
        &auth.actor(),
        topic_id,
        body.category_id,
        &body.title,
        &body.content,
    )
    .await?;
    Ok(Json(topic_to_json(&topic)))
}

pub async fn delete_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::forum::delete_topic(&state.db, &auth.actor(), topic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_pinned = fraghub_core::forum::toggle_pin(&state.db, &auth.actor(), topic_id).await?;
    Ok(Json(json!({ "is_pinned": is_pinned })))
}

pub async fn toggle_closed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_closed = fraghub_core::forum::toggle_closed(&state.db, &auth.actor(), topic_id).await?;
    Ok(Json(json!({ "is_closed": is_closed })))
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic_id): Path<i64>,
    Json(body): Json<MessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let message =
        fraghub_core::forum::post_message(&state.db, &auth.actor(), topic_id, &body.text).await?;
    Ok((StatusCode::CREATED, Json(message_to_json(&message))))
}

pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<Value>, ApiError> {
    let message =
        fraghub_core::forum::update_message(&state.db, &auth.actor(), message_id, &body.text)
            .await?;
    Ok(Json(message_to_json(&message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let topic_id =
        fraghub_core::forum::delete_message(&state.db, &auth.actor(), message_id).await?;
    Ok(Json(json!({ "deleted": message_id, "topic_id": topic_id })))
}
