use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fraghub_core::posts::PostInput;
use fraghub_core::AppState;
use fraghub_db::posts::{CommentRow, HashtagCountRow, PostRow};
use fraghub_models::content::PostMediaType;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

const PINNED_LIMIT: i64 = 5;
const FEED_LIMIT: i64 = 50;
const SIDEBAR_HASHTAGS: i64 = 10;

pub(crate) fn post_to_json(p: &PostRow) -> Value {
    json!({
        "id": p.id,
        "author_id": p.author_id,
        "author_username": p.author_username,
        "content": p.content,
        "media_type": p.media_type,
        "media_url": p.media_url,
        "is_pinned": p.is_pinned,
        "like_count": p.like_count,
        "created_at": p.created_at.to_rfc3339(),
        "updated_at": p.updated_at.to_rfc3339(),
    })
}

fn comment_to_json(c: &CommentRow) -> Value {
    json!({
        "id": c.id,
        "post_id": c.post_id,
        "author_id": c.author_id,
        "author_username": c.author_username,
        "content": c.content,
        "created_at": c.created_at.to_rfc3339(),
        "updated_at": c.updated_at.to_rfc3339(),
    })
}

pub(crate) fn hashtag_to_json(h: &HashtagCountRow) -> Value {
    json!({ "name": h.name, "post_count": h.post_count })
}

fn posts_json(posts: &[PostRow]) -> Vec<Value> {
    posts.iter().map(post_to_json).collect()
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pinned = fraghub_db::posts::list_posts(&state.db, true, PINNED_LIMIT).await?;
    let posts = fraghub_db::posts::list_posts(&state.db, false, FEED_LIMIT).await?;
    let hashtags = fraghub_db::posts::trending_hashtags(&state.db, SIDEBAR_HASHTAGS).await?;
    let hashtags: Vec<Value> = hashtags.iter().map(hashtag_to_json).collect();
    Ok(Json(json!({
        "pinned": posts_json(&pinned),
        "posts": posts_json(&posts),
        "trending_hashtags": hashtags,
    })))
}

pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    fraghub_db::users::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let posts = fraghub_db::posts::list_posts_by_user(&state.db, user_id).await?;
    Ok(Json(json!({ "posts": posts_json(&posts) })))
}

pub async fn list_hashtags(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let hashtags = fraghub_db::posts::trending_hashtags(&state.db, -1).await?;
    let hashtags: Vec<Value> = hashtags.iter().map(hashtag_to_json).collect();
    Ok(Json(json!({ "hashtags": hashtags })))
}

pub async fn list_hashtag_posts(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let name = name.trim().trim_start_matches('#').to_lowercase();
    if !fraghub_db::posts::hashtag_exists(&state.db, &name).await? {
        return Err(ApiError::NotFound);
    }
    let posts = fraghub_db::posts::list_posts_by_hashtag(&state.db, &name).await?;
    Ok(Json(json!({ "hashtag": name, "posts": posts_json(&posts) })))
}

pub async fn get_post(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let detail = fraghub_core::posts::get_post_detail(&state.db, post_id, auth.user_id()).await?;
    let comments: Vec<Value> = detail.comments.iter().map(comment_to_json).collect();
    Ok(Json(json!({
        "post": post_to_json(&detail.post),
        "hashtags": detail.hashtags,
        "comments": comments,
        "liked": detail.liked,
    })))
}

#[derive(Deserialize)]
pub struct PostRequest {
    pub content: String,
    #[serde(default = "default_media_type")]
    pub media_type: PostMediaType,
    pub media_url: Option<String>,
    /// Comma-separated, e.g. `"#mirage, ace"`.
    #[serde(default)]
    pub hashtags: String,
}

fn default_media_type() -> PostMediaType {
    PostMediaType::None
}

impl From<PostRequest> for PostInput {
    fn from(body: PostRequest) -> Self {
        PostInput {
            content: body.content,
            media_type: body.media_type,
            media_url: body.media_url,
            hashtags: body.hashtags,
        }
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PostRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let post = fraghub_core::posts::create_post(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(post_to_json(&post))))
}

pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
    Json(body): Json<PostRequest>,
) -> Result<Json<Value>, ApiError> {
    let post =
        fraghub_core::posts::update_post(&state.db, &auth.actor(), post_id, &body.into()).await?;
    Ok(Json(post_to_json(&post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::posts::delete_post(&state.db, &auth.actor(), post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (liked, like_count) =
        fraghub_core::posts::toggle_like(&state.db, &auth.actor(), post_id).await?;
    Ok(Json(json!({ "liked": liked, "like_count": like_count })))
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_pinned = fraghub_core::posts::toggle_pin(&state.db, &auth.actor(), post_id).await?;
    Ok(Json(json!({ "is_pinned": is_pinned })))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let comment =
        fraghub_core::posts::add_comment(&state.db, &auth.actor(), post_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(comment_to_json(&comment))))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<Value>, ApiError> {
    let comment =
        fraghub_core::posts::update_comment(&state.db, &auth.actor(), comment_id, &body.content)
            .await?;
    Ok(Json(comment_to_json(&comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let post_id = fraghub_core::posts::delete_comment(&state.db, &auth.actor(), comment_id).await?;
    Ok(Json(json!({ "deleted": comment_id, "post_id": post_id })))
}
