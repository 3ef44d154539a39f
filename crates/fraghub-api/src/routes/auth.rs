use axum::{extract::State, http::StatusCode, Json};
use fraghub_core::AppState;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::routes::users::user_to_json;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = fraghub_core::user::register(
        &state.db,
        &state.config,
        &body.username,
        &body.email,
        &body.password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user_to_json(&user, true) }))))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let session =
        fraghub_core::user::login(&state.db, &state.config, &body.username, &body.password).await?;
    Ok(Json(json!({
        "token": session.token,
        "session_id": session.session_id,
        "user": user_to_json(&session.user, true),
    })))
}
