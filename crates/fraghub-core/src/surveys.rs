use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::CoreError;
use crate::observability::metrics;
use crate::permissions::{require_role, Actor};
use crate::survey_sessions::SurveySessions;
use crate::votes::percentage;
use fraghub_db::surveys::{ChoiceRow, QuestionRow, ResponseOutcome, SurveyRow};
use fraghub_db::{DbError, DbPool};
use fraghub_models::role::Role;
use fraghub_models::survey::{ChoiceResult, PageOutcome, QuestionResult};

/// A question together with its choices, as shown to a respondent.
#[derive(Debug, Clone)]
pub struct QuestionView {
    pub question: QuestionRow,
    pub choices: Vec<ChoiceRow>,
}

/// One page of a survey ready to be rendered.
#[derive(Debug, Clone)]
pub struct SurveyPage {
    pub survey: SurveyRow,
    /// `None` for the single-page flow, which shows every question.
    pub page: Option<i64>,
    pub pages: Vec<i64>,
    pub next_page: Option<i64>,
    pub questions: Vec<QuestionView>,
    /// Answers already held for the shown questions in this session.
    pub selected: BTreeMap<i64, i64>,
}

#[derive(Debug, Clone)]
pub enum PageView {
    Page(SurveyPage),
    /// Single-page surveys are taken through the `take` flow.
    RedirectToTake,
}

#[derive(Debug, Clone)]
pub enum TakeView {
    Questions(SurveyPage),
    /// Multi-page surveys resume at the first page not yet submitted.
    RedirectToPage(i64),
}

/// Identifies who is answering and under which login session.
#[derive(Debug, Clone, Copy)]
pub struct Respondent<'a> {
    pub user_id: i64,
    pub session_id: &'a str,
}

fn group_choices(choices: Vec<ChoiceRow>) -> HashMap<i64, Vec<ChoiceRow>> {
    let mut by_question: HashMap<i64, Vec<ChoiceRow>> = HashMap::new();
    for choice in choices {
        by_question.entry(choice.question_id).or_default().push(choice);
    }
    by_question
}

fn attach_choices(
    questions: Vec<QuestionRow>,
    by_question: &mut HashMap<i64, Vec<ChoiceRow>>,
) -> Vec<QuestionView> {
    questions
        .into_iter()
        .map(|question| QuestionView {
            choices: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect()
}

/// Check a submission against the questions it is meant to answer.
///
/// Every answer must name a shown question and one of its choices; every shown
/// question that has choices must be answered.
pub fn validate_answers(
    questions: &[QuestionView],
    answers: &BTreeMap<i64, i64>,
) -> Result<(), CoreError> {
    let by_id: HashMap<i64, &QuestionView> = questions
        .iter()
        .map(|view| (view.question.id, view))
        .collect();

    for (question_id, choice_id) in answers {
        let view = by_id.get(question_id).ok_or(CoreError::InvalidOption)?;
        if !view.choices.iter().any(|choice| choice.id == *choice_id) {
            return Err(CoreError::InvalidOption);
        }
    }

    let missing: Vec<i64> = questions
        .iter()
        .filter(|view| !view.choices.is_empty() && !answers.contains_key(&view.question.id))
        .map(|view| view.question.id)
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::IncompleteSubmission(missing));
    }
    Ok(())
}

/// The survey, provided it exists, is active and `user_id` has not completed it.
pub async fn ensure_can_respond(
    pool: &DbPool,
    user_id: i64,
    survey_id: i64,
) -> Result<SurveyRow, CoreError> {
    let survey = fraghub_db::surveys::get_survey(pool, survey_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if !survey.is_active {
        return Err(CoreError::NotActive);
    }
    if fraghub_db::surveys::has_responded(pool, user_id, survey_id).await? {
        return Err(CoreError::AlreadyResponded);
    }
    Ok(survey)
}

/// First page not yet submitted in this session, or the last page when all are.
pub fn resume_page(pages: &[i64], completed: &BTreeSet<i64>) -> Option<i64> {
    pages
        .iter()
        .copied()
        .find(|page| !completed.contains(page))
        .or_else(|| pages.last().copied())
}

async fn load_page_inner(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    page: i64,
) -> Result<PageView, CoreError> {
    let survey = ensure_can_respond(pool, respondent.user_id, survey_id).await?;
    if !survey.is_multi_page {
        return Ok(PageView::RedirectToTake);
    }
    let pages = fraghub_db::surveys::list_pages(pool, survey_id).await?;
    if !pages.contains(&page) {
        return Err(CoreError::NotFound);
    }

    let questions = fraghub_db::surveys::get_page_questions(pool, survey_id, page).await?;
    let mut by_question = group_choices(fraghub_db::surveys::get_survey_choices(pool, survey_id).await?);
    let questions = attach_choices(questions, &mut by_question);

    let progress = sessions.get(respondent.session_id, survey_id).await;
    let selected = questions
        .iter()
        .filter_map(|view| {
            progress
                .answers
                .get(&view.question.id)
                .map(|choice| (view.question.id, *choice))
        })
        .collect();

    Ok(PageView::Page(SurveyPage {
        next_page: pages.iter().copied().find(|p| *p > page),
        survey,
        page: Some(page),
        pages,
        questions,
        selected,
    }))
}

/// Render page `page` of a multi-page survey.
pub async fn load_page(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    page: i64,
) -> Result<PageView, CoreError> {
    let result = load_page_inner(pool, sessions, respondent, survey_id, page).await;
    if let Err(err) = &result {
        metrics().observe_error(err);
    }
    result
}

async fn flush(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    answers: &BTreeMap<i64, i64>,
) -> Result<(), CoreError> {
    let pairs: Vec<(i64, i64)> = answers.iter().map(|(q, c)| (*q, *c)).collect();
    let outcome = fraghub_db::surveys::record_response(pool, respondent.user_id, survey_id, &pairs).await;
    match outcome {
        Ok(ResponseOutcome::Recorded(response)) => {
            sessions.clear(respondent.session_id, survey_id).await;
            metrics().survey_completed();
            tracing::info!(
                user_id = respondent.user_id,
                survey_id,
                response_id = response.id,
                answers = pairs.len(),
                "survey completed"
            );
            Ok(())
        }
        Ok(ResponseOutcome::SurveyClosed) => Err(CoreError::NotActive),
        Ok(ResponseOutcome::ChoiceMismatch { .. }) => {
            sessions.clear(respondent.session_id, survey_id).await;
            Err(CoreError::InvalidOption)
        }
        Err(DbError::UniqueViolation) => {
            sessions.clear(respondent.session_id, survey_id).await;
            Err(CoreError::AlreadyResponded)
        }
        Err(e) => Err(e.into()),
    }
}

async fn submit_page_inner(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    page: i64,
    answers: &BTreeMap<i64, i64>,
) -> Result<PageOutcome, CoreError> {
    let survey = ensure_can_respond(pool, respondent.user_id, survey_id).await?;
    if !survey.is_multi_page {
        return Err(CoreError::BadRequest(
            "single-page surveys are submitted through take".into(),
        ));
    }
    let pages = fraghub_db::surveys::list_pages(pool, survey_id).await?;
    if !pages.contains(&page) {
        return Err(CoreError::NotFound);
    }

    let mut progress = sessions.get(respondent.session_id, survey_id).await;
    if let Some(skipped) = pages
        .iter()
        .take_while(|p| **p < page)
        .find(|p| !progress.completed_pages.contains(p))
    {
        return Err(CoreError::BadRequest(format!("page {skipped} has not been submitted")));
    }

    let all_questions = fraghub_db::surveys::get_survey_questions(pool, survey_id).await?;
    let mut by_question = group_choices(fraghub_db::surveys::get_survey_choices(pool, survey_id).await?);
    let views = attach_choices(all_questions, &mut by_question);
    let (page_views, other_views): (Vec<QuestionView>, Vec<QuestionView>) =
        views.into_iter().partition(|view| view.question.page == page);

    validate_answers(&page_views, answers)?;

    let page_question_ids: Vec<i64> = page_views.iter().map(|view| view.question.id).collect();
    progress.merge_page(page, &page_question_ids, answers);

    let current: HashMap<i64, &QuestionView> = page_views
        .iter()
        .chain(other_views.iter())
        .map(|view| (view.question.id, view))
        .collect();
    let dropped = progress.retain_current(|question_id, choice_id| {
        current
            .get(&question_id)
            .is_some_and(|view| view.choices.iter().any(|choice| choice.id == choice_id))
    });
    if dropped > 0 {
        tracing::debug!(user_id = respondent.user_id, survey_id, dropped, "discarded stale survey answers");
    }

    if let Some(next) = pages.iter().copied().find(|p| *p > page) {
        sessions.store(respondent.session_id, survey_id, progress).await;
        tracing::debug!(user_id = respondent.user_id, survey_id, page, next, "survey page accepted");
        return Ok(PageOutcome::Next { page: next });
    }

    // Last page: the accumulator must cover the whole survey before anything is counted.
    let missing: Vec<i64> = page_views
        .iter()
        .chain(other_views.iter())
        .filter(|view| !view.choices.is_empty() && !progress.answers.contains_key(&view.question.id))
        .map(|view| view.question.id)
        .collect();
    if !missing.is_empty() {
        sessions.store(respondent.session_id, survey_id, progress).await;
        return Err(CoreError::IncompleteSubmission(missing));
    }

    flush(pool, sessions, respondent, survey_id, &progress.answers).await?;
    Ok(PageOutcome::Complete)
}

/// Submit the answers for page `page`; advances to the next page or, on the last
/// page, records the whole response.
pub async fn submit_page(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    page: i64,
    answers: &BTreeMap<i64, i64>,
) -> Result<PageOutcome, CoreError> {
    let result = submit_page_inner(pool, sessions, respondent, survey_id, page, answers).await;
    if let Err(err) = &result {
        metrics().observe_error(err);
    }
    result
}

async fn load_take_inner(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
) -> Result<TakeView, CoreError> {
    let survey = ensure_can_respond(pool, respondent.user_id, survey_id).await?;
    let pages = fraghub_db::surveys::list_pages(pool, survey_id).await?;

    if survey.is_multi_page {
        let progress = sessions.get(respondent.session_id, survey_id).await;
        let page = resume_page(&pages, &progress.completed_pages).ok_or(CoreError::NotFound)?;
        return Ok(TakeView::RedirectToPage(page));
    }

    let questions = fraghub_db::surveys::get_survey_questions(pool, survey_id).await?;
    let mut by_question = group_choices(fraghub_db::surveys::get_survey_choices(pool, survey_id).await?);
    Ok(TakeView::Questions(SurveyPage {
        survey,
        page: None,
        pages,
        next_page: None,
        questions: attach_choices(questions, &mut by_question),
        selected: BTreeMap::new(),
    }))
}

/// Begin the single-page flow.
pub async fn load_take(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
) -> Result<TakeView, CoreError> {
    let result = load_take_inner(pool, sessions, respondent, survey_id).await;
    if let Err(err) = &result {
        metrics().observe_error(err);
    }
    result
}

async fn submit_take_inner(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    answers: &BTreeMap<i64, i64>,
) -> Result<(), CoreError> {
    let survey = ensure_can_respond(pool, respondent.user_id, survey_id).await?;
    if survey.is_multi_page {
        return Err(CoreError::BadRequest(
            "multi-page surveys are submitted page by page".into(),
        ));
    }
    let questions = fraghub_db::surveys::get_survey_questions(pool, survey_id).await?;
    let mut by_question = group_choices(fraghub_db::surveys::get_survey_choices(pool, survey_id).await?);
    let views = attach_choices(questions, &mut by_question);
    validate_answers(&views, answers)?;
    flush(pool, sessions, respondent, survey_id, answers).await
}

/// Validate and record a single-page survey in one step.
pub async fn submit_take(
    pool: &DbPool,
    sessions: &SurveySessions,
    respondent: Respondent<'_>,
    survey_id: i64,
    answers: &BTreeMap<i64, i64>,
) -> Result<(), CoreError> {
    let result = submit_take_inner(pool, sessions, respondent, survey_id, answers).await;
    if let Err(err) = &result {
        metrics().observe_error(err);
    }
    result
}

/// Per-question tallies ordered by (page, sort order, id).
pub async fn survey_results(pool: &DbPool, survey_id: i64) -> Result<Vec<QuestionResult>, CoreError> {
    fraghub_db::surveys::get_survey(pool, survey_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let questions = fraghub_db::surveys::get_survey_questions(pool, survey_id).await?;
    let mut by_question = group_choices(fraghub_db::surveys::get_survey_choices(pool, survey_id).await?);

    Ok(attach_choices(questions, &mut by_question)
        .into_iter()
        .map(|view| {
            let total_votes: i64 = view.choices.iter().map(|choice| choice.votes).sum();
            QuestionResult {
                question_id: view.question.id,
                text: view.question.text,
                page: view.question.page,
                total_votes,
                choices: view
                    .choices
                    .into_iter()
                    .map(|choice| ChoiceResult {
                        choice_id: choice.id,
                        percentage: percentage(choice.votes, total_votes),
                        text: choice.text,
                        votes: choice.votes,
                    })
                    .collect(),
            }
        })
        .collect())
}

/// Survey metadata for listings and the detail page.
#[derive(Debug, Clone)]
pub struct SurveySummary {
    pub survey: SurveyRow,
    pub question_count: i64,
    pub pages: Vec<i64>,
    pub responses: i64,
    pub has_responded: bool,
}

pub async fn get_survey_summary(
    pool: &DbPool,
    survey_id: i64,
    viewer: Option<i64>,
) -> Result<SurveySummary, CoreError> {
    let survey = fraghub_db::surveys::get_survey(pool, survey_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let has_responded = match viewer {
        Some(user_id) => fraghub_db::surveys::has_responded(pool, user_id, survey_id).await?,
        None => false,
    };
    Ok(SurveySummary {
        question_count: fraghub_db::surveys::count_questions(pool, survey_id).await?,
        pages: fraghub_db::surveys::list_pages(pool, survey_id).await?,
        responses: fraghub_db::surveys::count_responses(pool, survey_id).await?,
        survey,
        has_responded,
    })
}

#[derive(Debug, Clone)]
pub struct SurveyInput {
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub is_multi_page: bool,
}

fn require_text(value: &str, field: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub async fn create_survey(pool: &DbPool, actor: &Actor, input: &SurveyInput) -> Result<SurveyRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(&input.title, "title")?;
    let survey = fraghub_db::surveys::create_survey(
        pool,
        input.title.trim(),
        &input.description,
        input.is_active,
        input.is_multi_page,
    )
    .await?;
    tracing::info!(survey_id = survey.id, by = actor.user_id, "survey created");
    Ok(survey)
}

pub async fn update_survey(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    input: &SurveyInput,
) -> Result<SurveyRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(&input.title, "title")?;
    Ok(fraghub_db::surveys::update_survey(
        pool,
        survey_id,
        input.title.trim(),
        &input.description,
        input.is_active,
        input.is_multi_page,
    )
    .await?)
}

pub async fn delete_survey(pool: &DbPool, actor: &Actor, survey_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::surveys::delete_survey(pool, survey_id).await? {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

async fn question_of_survey(pool: &DbPool, survey_id: i64, question_id: i64) -> Result<QuestionRow, CoreError> {
    fraghub_db::surveys::get_question(pool, question_id)
        .await?
        .filter(|question| question.survey_id == survey_id)
        .ok_or(CoreError::NotFound)
}

fn validate_page(page: i64) -> Result<(), CoreError> {
    if page < 1 {
        return Err(CoreError::BadRequest("page must be at least 1".into()));
    }
    Ok(())
}

pub async fn add_question(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    text: &str,
    page: i64,
    sort_order: i64,
) -> Result<QuestionRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(text, "question text")?;
    validate_page(page)?;
    fraghub_db::surveys::get_survey(pool, survey_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    Ok(fraghub_db::surveys::create_question(pool, survey_id, text.trim(), page, sort_order).await?)
}

pub async fn update_question(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    question_id: i64,
    text: &str,
    page: i64,
    sort_order: i64,
) -> Result<QuestionRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(text, "question text")?;
    validate_page(page)?;
    question_of_survey(pool, survey_id, question_id).await?;
    Ok(fraghub_db::surveys::update_question(pool, question_id, text.trim(), page, sort_order).await?)
}

pub async fn delete_question(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    question_id: i64,
) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    question_of_survey(pool, survey_id, question_id).await?;
    fraghub_db::surveys::delete_question(pool, question_id).await?;
    Ok(())
}

pub async fn add_choice(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    question_id: i64,
    text: &str,
) -> Result<ChoiceRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(text, "choice text")?;
    question_of_survey(pool, survey_id, question_id).await?;
    Ok(fraghub_db::surveys::create_choice(pool, question_id, text.trim()).await?)
}

async fn choice_of_survey(pool: &DbPool, survey_id: i64, choice_id: i64) -> Result<ChoiceRow, CoreError> {
    let choice = fraghub_db::surveys::get_choice(pool, choice_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    question_of_survey(pool, survey_id, choice.question_id).await?;
    Ok(choice)
}

pub async fn update_choice(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    choice_id: i64,
    text: &str,
) -> Result<ChoiceRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    require_text(text, "choice text")?;
    choice_of_survey(pool, survey_id, choice_id).await?;
    Ok(fraghub_db::surveys::update_choice(pool, choice_id, text.trim()).await?)
}

pub async fn delete_choice(
    pool: &DbPool,
    actor: &Actor,
    survey_id: i64,
    choice_id: i64,
) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    choice_of_survey(pool, survey_id, choice_id).await?;
    fraghub_db::surveys::delete_choice(pool, choice_id).await?;
    Ok(())
}
