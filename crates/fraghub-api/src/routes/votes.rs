use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use fraghub_core::votes::VoteInput;
use fraghub_core::AppState;
use fraghub_db::votes::{VoteOptionRow, VoteRow, VoteTotalRow};
use fraghub_models::vote::{VoteResults, VoteType};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

const POPULAR_LIMIT: i64 = 10;

fn detail_path(vote_id: i64) -> String {
    format!("/vote/{vote_id}/")
}

fn type_label(raw: &str) -> Value {
    match raw.parse::<VoteType>() {
        Ok(vote_type) => json!(vote_type.display_name()),
        Err(_) => Value::Null,
    }
}

pub(crate) fn vote_to_json(v: &VoteRow, now: DateTime<Utc>) -> Value {
    json!({
        "id": v.id,
        "title": v.title,
        "description": v.description,
        "vote_type": v.vote_type,
        "vote_type_display": type_label(&v.vote_type),
        "is_active": v.is_active,
        "is_open": v.is_open(now),
        "end_date": v.end_date.map(|d| d.to_rfc3339()),
        "created_at": v.created_at.to_rfc3339(),
    })
}

fn option_to_json(o: &VoteOptionRow) -> Value {
    json!({
        "id": o.id,
        "vote_id": o.vote_id,
        "text": o.text,
        "image_url": o.image_url,
        "votes": o.votes,
    })
}

fn total_to_json(t: &VoteTotalRow) -> Value {
    json!({
        "id": t.id,
        "title": t.title,
        "vote_type": t.vote_type,
        "is_active": t.is_active,
        "total_votes": t.total_votes,
    })
}

fn votes_json(votes: &[VoteRow], now: DateTime<Utc>) -> Vec<Value> {
    votes.iter().map(|v| vote_to_json(v, now)).collect()
}

pub async fn list_votes(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let votes = fraghub_db::votes::list_votes(&state.db).await?;
    let (active_count, inactive_count) = fraghub_db::votes::count_votes_by_state(&state.db).await?;
    Ok(Json(json!({
        "votes": votes_json(&votes, now),
        "active_count": active_count,
        "inactive_count": inactive_count,
    })))
}

pub async fn list_active(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let votes = fraghub_db::votes::list_open_votes(&state.db, now, -1).await?;
    Ok(Json(json!({ "votes": votes_json(&votes, now) })))
}

pub async fn list_popular(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let votes = fraghub_db::votes::list_popular_votes(&state.db, POPULAR_LIMIT).await?;
    let votes: Vec<Value> = votes.iter().map(total_to_json).collect();
    Ok(Json(json!({ "votes": votes })))
}

pub async fn list_daily(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let votes = fraghub_core::votes::list_daily_votes(&state.db, now).await?;
    Ok(Json(json!({ "votes": votes_json(&votes, now) })))
}

pub async fn list_weekly(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let votes = fraghub_core::votes::list_weekly_votes(&state.db, now).await?;
    Ok(Json(json!({ "votes": votes_json(&votes, now) })))
}

pub async fn list_by_type(
    State(state): State<AppState>,
    Path(vote_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let vote_type: VoteType = vote_type.parse()?;
    let votes = fraghub_db::votes::list_votes_by_type(&state.db, vote_type).await?;
    Ok(Json(json!({
        "vote_type": vote_type,
        "vote_type_display": vote_type.display_name(),
        "votes": votes_json(&votes, Utc::now()),
    })))
}

pub async fn get_vote(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(vote_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let detail =
        fraghub_core::votes::get_vote_detail(&state.db, vote_id, auth.user_id(), now).await?;
    let options: Vec<Value> = detail.options.iter().map(option_to_json).collect();
    Ok(Json(json!({
        "vote": vote_to_json(&detail.vote, now),
        "options": options,
        "is_open": detail.is_open,
        "has_voted": detail.ballot.is_some(),
        "ballot": detail.ballot.map(|b| json!({
            "option_id": b.option_id,
            "voted_at": b.voted_at.to_rfc3339(),
        })),
    })))
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub option: i64,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vote_id): Path<i64>,
    Json(body): Json<CastVoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let ballot =
        fraghub_core::votes::cast_vote(&state.db, auth.user_id, vote_id, body.option, Utc::now())
            .await
            .map_err(|e| ApiError::from(e).redirect_to(detail_path(vote_id)))?;
    Ok(Json(json!({
        "vote_id": ballot.vote_id,
        "option_id": ballot.option_id,
        "voted_at": ballot.voted_at.to_rfc3339(),
        "results": format!("/vote/{vote_id}/results/"),
    })))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(vote_id): Path<i64>,
) -> Result<Json<VoteResults>, ApiError> {
    Ok(Json(fraghub_core::votes::compute_results(&state.db, vote_id).await?))
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub vote_type: VoteType,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl From<VoteRequest> for VoteInput {
    fn from(body: VoteRequest) -> Self {
        VoteInput {
            title: body.title,
            description: body.description,
            vote_type: body.vote_type,
            is_active: body.is_active,
            end_date: body.end_date,
        }
    }
}

pub async fn create_vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<VoteRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let vote = fraghub_core::votes::create_vote(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(vote_to_json(&vote, Utc::now()))))
}

pub async fn update_vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vote_id): Path<i64>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let vote =
        fraghub_core::votes::update_vote(&state.db, &auth.actor(), vote_id, &body.into()).await?;
    Ok(Json(vote_to_json(&vote, Utc::now())))
}

pub async fn delete_vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vote_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::votes::delete_vote(&state.db, &auth.actor(), vote_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct OptionRequest {
    pub text: String,
    pub image_url: Option<String>,
}

pub async fn add_option(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vote_id): Path<i64>,
    Json(body): Json<OptionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let option = fraghub_core::votes::add_option(
        &state.db,
        &auth.actor(),
        vote_id,
        &body.text,
        body.image_url.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(option_to_json(&option))))
}

pub async fn update_option(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((vote_id, option_id)): Path<(i64, i64)>,
    Json(body): Json<OptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let option = fraghub_core::votes::update_option(
        &state.db,
        &auth.actor(),
        vote_id,
        option_id,
        &body.text,
        body.image_url.as_deref(),
    )
    .await?;
    Ok(Json(option_to_json(&option)))
}

pub async fn delete_option(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((vote_id, option_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::votes::delete_option(&state.db, &auth.actor(), vote_id, option_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
