use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fraghub_core::error::CoreError;
use fraghub_core::surveys::{PageView, Respondent, SurveyInput, SurveyPage, TakeView};
use fraghub_core::AppState;
use fraghub_db::surveys::{ChoiceRow, QuestionRow, SurveyRow};
use fraghub_models::survey::{PageOutcome, QuestionResult};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser};

fn results_path(survey_id: i64) -> String {
    format!("/survey/{survey_id}/results/")
}

fn page_path(survey_id: i64, page: i64) -> String {
    format!("/survey/{survey_id}/page/{page}/")
}

fn take_path(survey_id: i64) -> String {
    format!("/survey/{survey_id}/take/")
}

/// Unanswered questions send the client back to `form`; other rejections go
/// to the results page.
fn submission_error(err: CoreError, survey_id: i64, form: String) -> ApiError {
    let location = match err {
        CoreError::IncompleteSubmission(_) => form,
        _ => results_path(survey_id),
    };
    ApiError::from(err).redirect_to(location)
}

/// 303 to `location`, repeating the target in the body for JSON clients.
fn see_other(location: String, mut body: Value) -> Response {
    body["redirect"] = json!(location);
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)], Json(body)).into_response()
}

fn respondent(auth: &AuthUser) -> Respondent<'_> {
    Respondent {
        user_id: auth.user_id,
        session_id: &auth.session_id,
    }
}

fn survey_to_json(s: &SurveyRow) -> Value {
    json!({
        "id": s.id,
        "title": s.title,
        "description": s.description,
        "is_active": s.is_active,
        "is_multi_page": s.is_multi_page,
        "created_at": s.created_at.to_rfc3339(),
    })
}

fn question_to_json(q: &QuestionRow) -> Value {
    json!({
        "id": q.id,
        "survey_id": q.survey_id,
        "text": q.text,
        "page": q.page,
        "sort_order": q.sort_order,
    })
}

/// Tallies stay hidden until the results view.
fn choice_to_json(c: &ChoiceRow) -> Value {
    json!({
        "id": c.id,
        "question_id": c.question_id,
        "text": c.text,
    })
}

fn page_to_json(page: &SurveyPage) -> Value {
    let questions: Vec<Value> = page
        .questions
        .iter()
        .map(|view| {
            let mut question = question_to_json(&view.question);
            question["choices"] = view.choices.iter().map(choice_to_json).collect();
            question
        })
        .collect();
    json!({
        "survey": survey_to_json(&page.survey),
        "page": page.page,
        "pages": page.pages,
        "next_page": page.next_page,
        "is_last_page": page.page.is_some() && page.next_page.is_none(),
        "questions": questions,
        "selected": page.selected,
    })
}

pub async fn list_surveys(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let surveys = fraghub_db::surveys::list_surveys(&state.db, false).await?;
    let active_count = fraghub_db::surveys::count_active_surveys(&state.db).await?;
    let surveys: Vec<Value> = surveys.iter().map(survey_to_json).collect();
    Ok(Json(json!({ "surveys": surveys, "active_count": active_count })))
}

pub async fn list_active(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let surveys = fraghub_db::surveys::list_surveys(&state.db, true).await?;
    let surveys: Vec<Value> = surveys.iter().map(survey_to_json).collect();
    Ok(Json(json!({ "surveys": surveys })))
}

pub async fn get_survey(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(survey_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let summary =
        fraghub_core::surveys::get_survey_summary(&state.db, survey_id, auth.user_id()).await?;
    Ok(Json(json!({
        "survey": survey_to_json(&summary.survey),
        "question_count": summary.question_count,
        "pages": summary.pages,
        "responses": summary.responses,
        "has_responded": summary.has_responded,
    })))
}

pub async fn get_take(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<i64>,
) -> Result<Response, ApiError> {
    let view = fraghub_core::surveys::load_take(
        &state.db,
        &state.survey_sessions,
        respondent(&auth),
        survey_id,
    )
    .await
    .map_err(|e| ApiError::from(e).redirect_to(results_path(survey_id)))?;

    Ok(match view {
        TakeView::Questions(page) => Json(page_to_json(&page)).into_response(),
        TakeView::RedirectToPage(page) => {
            see_other(page_path(survey_id, page), json!({ "page": page }))
        }
    })
}

#[derive(Deserialize)]
pub struct AnswersRequest {
    /// Question id to chosen choice id.
    #[serde(default)]
    pub answers: BTreeMap<i64, i64>,
}

pub async fn post_take(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<i64>,
    Json(body): Json<AnswersRequest>,
) -> Result<Response, ApiError> {
    fraghub_core::surveys::submit_take(
        &state.db,
        &state.survey_sessions,
        respondent(&auth),
        survey_id,
        &body.answers,
    )
    .await
    .map_err(|e| submission_error(e, survey_id, take_path(survey_id)))?;

    Ok(see_other(results_path(survey_id), json!(PageOutcome::Complete)))
}

pub async fn get_page(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, page)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let view = fraghub_core::surveys::load_page(
        &state.db,
        &state.survey_sessions,
        respondent(&auth),
        survey_id,
        page,
    )
    .await
    .map_err(|e| ApiError::from(e).redirect_to(results_path(survey_id)))?;

    Ok(match view {
        PageView::Page(page) => Json(page_to_json(&page)).into_response(),
        PageView::RedirectToTake => see_other(take_path(survey_id), json!({})),
    })
}

pub async fn post_page(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, page)): Path<(i64, i64)>,
    Json(body): Json<AnswersRequest>,
) -> Result<Response, ApiError> {
    let outcome = fraghub_core::surveys::submit_page(
        &state.db,
        &state.survey_sessions,
        respondent(&auth),
        survey_id,
        page,
        &body.answers,
    )
    .await
    .map_err(|e| submission_error(e, survey_id, page_path(survey_id, page)))?;

    let location = match outcome {
        PageOutcome::Next { page } => page_path(survey_id, page),
        PageOutcome::Complete => results_path(survey_id),
    };
    Ok(see_other(location, json!(outcome)))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(survey_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let survey = fraghub_db::surveys::get_survey(&state.db, survey_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let questions: Vec<QuestionResult> =
        fraghub_core::surveys::survey_results(&state.db, survey_id).await?;
    let responses = fraghub_db::surveys::count_responses(&state.db, survey_id).await?;
    Ok(Json(json!({
        "survey": survey_to_json(&survey),
        "responses": responses,
        "questions": questions,
    })))
}

#[derive(Deserialize)]
pub struct SurveyRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_multi_page: bool,
}

fn default_true() -> bool {
    true
}

impl From<SurveyRequest> for SurveyInput {
    fn from(body: SurveyRequest) -> Self {
        SurveyInput {
            title: body.title,
            description: body.description,
            is_active: body.is_active,
            is_multi_page: body.is_multi_page,
        }
    }
}

pub async fn create_survey(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SurveyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let survey = fraghub_core::surveys::create_survey(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(survey_to_json(&survey))))
}

pub async fn update_survey(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<i64>,
    Json(body): Json<SurveyRequest>,
) -> Result<Json<Value>, ApiError> {
    let survey =
        fraghub_core::surveys::update_survey(&state.db, &auth.actor(), survey_id, &body.into())
            .await?;
    Ok(Json(survey_to_json(&survey)))
}

pub async fn delete_survey(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::surveys::delete_survey(&state.db, &auth.actor(), survey_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub text: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub sort_order: i64,
}

fn default_page() -> i64 {
    1
}

pub async fn add_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<i64>,
    Json(body): Json<QuestionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let question = fraghub_core::surveys::add_question(
        &state.db,
        &auth.actor(),
        survey_id,
        &body.text,
        body.page,
        body.sort_order,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(question_to_json(&question))))
}

pub async fn update_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, question_id)): Path<(i64, i64)>,
    Json(body): Json<QuestionRequest>,
) -> Result<Json<Value>, ApiError> {
    let question = fraghub_core::surveys::update_question(
        &state.db,
        &auth.actor(),
        survey_id,
        question_id,
        &body.text,
        body.page,
        body.sort_order,
    )
    .await?;
    Ok(Json(question_to_json(&question)))
}

pub async fn delete_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, question_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::surveys::delete_question(&state.db, &auth.actor(), survey_id, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChoiceRequest {
    pub text: String,
}

pub async fn add_choice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, question_id)): Path<(i64, i64)>,
    Json(body): Json<ChoiceRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let choice = fraghub_core::surveys::add_choice(
        &state.db,
        &auth.actor(),
        survey_id,
        question_id,
        &body.text,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(choice_to_json(&choice))))
}

pub async fn update_choice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, choice_id)): Path<(i64, i64)>,
    Json(body): Json<ChoiceRequest>,
) -> Result<Json<Value>, ApiError> {
    let choice = fraghub_core::surveys::update_choice(
        &state.db,
        &auth.actor(),
        survey_id,
        choice_id,
        &body.text,
    )
    .await?;
    Ok(Json(choice_to_json(&choice)))
}

pub async fn delete_choice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((survey_id, choice_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::surveys::delete_choice(&state.db, &auth.actor(), survey_id, choice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
