use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fraghub_core::AppState;
use fraghub_db::users::UserRow;
use fraghub_models::role::Role;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

/// E-mail addresses are only shown to their owner and to moderators.
pub(crate) fn user_to_json(user: &UserRow, include_email: bool) -> Value {
    let mut value = json!({
        "id": user.id,
        "username": user.username,
        "role": user.role(),
        "bio": user.bio,
        "avatar_url": user.avatar_url,
        "steam_profile": user.steam_profile,
        "created_at": user.created_at.to_rfc3339(),
    });
    if include_email {
        value["email"] = json!(user.email);
    }
    value
}

fn profile_to_json(profile: &fraghub_core::user::Profile, include_email: bool) -> Value {
    json!({
        "user": user_to_json(&profile.user, include_email),
        "post_count": profile.post_count,
        "gallery_count": profile.gallery_count,
    })
}

pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = fraghub_core::user::get_profile(&state.db, auth.user_id).await?;
    Ok(Json(profile_to_json(&profile, true)))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub steam_profile: Option<String>,
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = fraghub_core::user::update_profile(
        &state.db,
        &auth.actor(),
        body.bio.as_deref(),
        body.avatar_url.as_deref(),
        body.steam_profile.as_deref(),
    )
    .await?;
    Ok(Json(user_to_json(&user, true)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let profile = fraghub_core::user::get_profile(&state.db, user_id).await?;
    let include_email = auth
        .actor()
        .is_some_and(|actor| actor.user_id == user_id || actor.is_moderator());
    Ok(Json(profile_to_json(&profile, include_email)))
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Value>, ApiError> {
    let role = query.role.as_deref().map(str::parse::<Role>).transpose()?;
    let users = fraghub_core::user::list_users(&state.db, &auth.actor(), role).await?;
    let users: Vec<Value> = users.iter().map(|u| user_to_json(u, true)).collect();
    Ok(Json(json!({ "users": users })))
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = fraghub_core::user::set_role(&state.db, &auth.actor(), user_id, body.role).await?;
    Ok(Json(user_to_json(&user, true)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::user::delete_user(&state.db, &auth.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
