use crate::{classify, DbError, DbPool};
use chrono::{DateTime, Utc};

const SURVEY_COLUMNS: &str = "id, title, description, is_active, is_multi_page, created_at";
const QUESTION_COLUMNS: &str = "id, survey_id, text, page, sort_order";
const CHOICE_COLUMNS: &str = "id, question_id, text, votes";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub is_multi_page: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub survey_id: i64,
    pub text: String,
    pub page: i64,
    pub sort_order: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChoiceRow {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub votes: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyResponseRow {
    pub id: i64,
    pub user_id: i64,
    pub survey_id: i64,
    pub completed_at: DateTime<Utc>,
}

/// Result of [`record_response`]. Anything other than `Recorded` rolled back.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    Recorded(SurveyResponseRow),
    SurveyClosed,
    ChoiceMismatch { question_id: i64, choice_id: i64 },
}

pub async fn create_survey(
    pool: &DbPool,
    title: &str,
    description: &str,
    is_active: bool,
    is_multi_page: bool,
) -> Result<SurveyRow, DbError> {
    let sql = format!(
        "INSERT INTO surveys (title, description, is_active, is_multi_page)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING {SURVEY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SurveyRow>(&sql)
        .bind(title)
        .bind(description)
        .bind(is_active)
        .bind(is_multi_page)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_survey(pool: &DbPool, id: i64) -> Result<Option<SurveyRow>, DbError> {
    let sql = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = ?1");
    let row = sqlx::query_as::<_, SurveyRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_survey(
    pool: &DbPool,
    id: i64,
    title: &str,
    description: &str,
    is_active: bool,
    is_multi_page: bool,
) -> Result<SurveyRow, DbError> {
    let sql = format!(
        "UPDATE surveys
         SET title = ?2, description = ?3, is_active = ?4, is_multi_page = ?5
         WHERE id = ?1
         RETURNING {SURVEY_COLUMNS}"
    );
    sqlx::query_as::<_, SurveyRow>(&sql)
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(is_active)
        .bind(is_multi_page)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_survey(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM surveys WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_surveys(pool: &DbPool, active_only: bool) -> Result<Vec<SurveyRow>, DbError> {
    let sql = if active_only {
        format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE is_active = 1 ORDER BY created_at DESC, id DESC")
    } else {
        format!("SELECT {SURVEY_COLUMNS} FROM surveys ORDER BY created_at DESC, id DESC")
    };
    let rows = sqlx::query_as::<_, SurveyRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn count_active_surveys(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM surveys WHERE is_active = 1")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create_question(
    pool: &DbPool,
    survey_id: i64,
    text: &str,
    page: i64,
    sort_order: i64,
) -> Result<QuestionRow, DbError> {
    let sql = format!(
        "INSERT INTO survey_questions (survey_id, text, page, sort_order)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING {QUESTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(survey_id)
        .bind(text)
        .bind(page)
        .bind(sort_order)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_question(pool: &DbPool, id: i64) -> Result<Option<QuestionRow>, DbError> {
    let sql = format!("SELECT {QUESTION_COLUMNS} FROM survey_questions WHERE id = ?1");
    let row = sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_question(
    pool: &DbPool,
    id: i64,
    text: &str,
    page: i64,
    sort_order: i64,
) -> Result<QuestionRow, DbError> {
    let sql = format!(
        "UPDATE survey_questions SET text = ?2, page = ?3, sort_order = ?4
         WHERE id = ?1
         RETURNING {QUESTION_COLUMNS}"
    );
    sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(id)
        .bind(text)
        .bind(page)
        .bind(sort_order)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_question(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM survey_questions WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn create_choice(pool: &DbPool, question_id: i64, text: &str) -> Result<ChoiceRow, DbError> {
    let sql = format!(
        "INSERT INTO survey_choices (question_id, text) VALUES (?1, ?2) RETURNING {CHOICE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ChoiceRow>(&sql)
        .bind(question_id)
        .bind(text)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_choice(pool: &DbPool, id: i64) -> Result<Option<ChoiceRow>, DbError> {
    let sql = format!("SELECT {CHOICE_COLUMNS} FROM survey_choices WHERE id = ?1");
    let row = sqlx::query_as::<_, ChoiceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_choice(pool: &DbPool, id: i64, text: &str) -> Result<ChoiceRow, DbError> {
    let sql = format!("UPDATE survey_choices SET text = ?2 WHERE id = ?1 RETURNING {CHOICE_COLUMNS}");
    sqlx::query_as::<_, ChoiceRow>(&sql)
        .bind(id)
        .bind(text)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_choice(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM survey_choices WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Distinct page numbers carrying at least one question, ascending.
pub async fn list_pages(pool: &DbPool, survey_id: i64) -> Result<Vec<i64>, DbError> {
    let pages = sqlx::query_scalar(
        "SELECT DISTINCT page FROM survey_questions WHERE survey_id = ?1 ORDER BY page ASC",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(pages)
}

/// Every question of the survey ordered by (page, sort_order, id).
pub async fn get_survey_questions(pool: &DbPool, survey_id: i64) -> Result<Vec<QuestionRow>, DbError> {
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM survey_questions
         WHERE survey_id = ?1
         ORDER BY page ASC, sort_order ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(survey_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_page_questions(
    pool: &DbPool,
    survey_id: i64,
    page: i64,
) -> Result<Vec<QuestionRow>, DbError> {
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM survey_questions
         WHERE survey_id = ?1 AND page = ?2
         ORDER BY sort_order ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(survey_id)
        .bind(page)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// All choices belonging to the survey's questions, in insertion order.
pub async fn get_survey_choices(pool: &DbPool, survey_id: i64) -> Result<Vec<ChoiceRow>, DbError> {
    let rows = sqlx::query_as::<_, ChoiceRow>(
        "SELECT c.id, c.question_id, c.text, c.votes
         FROM survey_choices c
         JOIN survey_questions q ON q.id = c.question_id
         WHERE q.survey_id = ?1
         ORDER BY c.id ASC",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_questions(pool: &DbPool, survey_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM survey_questions WHERE survey_id = ?1")
        .bind(survey_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_responses(pool: &DbPool, survey_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE survey_id = ?1")
        .bind(survey_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn has_responded(pool: &DbPool, user_id: i64, survey_id: i64) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM survey_responses WHERE user_id = ?1 AND survey_id = ?2",
    )
    .bind(user_id)
    .bind(survey_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Persist a completed response and bump one choice per answered question.
///
/// The response row goes in first, guarded by the survey being active; each
/// increment is guarded by the choice belonging to the question and the question
/// belonging to the survey. A repeat response fails with [`DbError::UniqueViolation`].
pub async fn record_response(
    pool: &DbPool,
    user_id: i64,
    survey_id: i64,
    answers: &[(i64, i64)],
) -> Result<ResponseOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let response = sqlx::query_as::<_, SurveyResponseRow>(
        "INSERT INTO survey_responses (user_id, survey_id)
         SELECT ?1, s.id FROM surveys s WHERE s.id = ?2 AND s.is_active = 1
         RETURNING id, user_id, survey_id, completed_at",
    )
    .bind(user_id)
    .bind(survey_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(classify)?;

    let Some(response) = response else {
        tx.rollback().await?;
        return Ok(ResponseOutcome::SurveyClosed);
    };

    for &(question_id, choice_id) in answers {
        let result = sqlx::query(
            "UPDATE survey_choices SET votes = votes + 1
             WHERE id = ?1
               AND question_id = ?2
               AND question_id IN (SELECT id FROM survey_questions WHERE survey_id = ?3)",
        )
        .bind(choice_id)
        .bind(question_id)
        .bind(survey_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(ResponseOutcome::ChoiceMismatch {
                question_id,
                choice_id,
            });
        }
    }

    tx.commit().await?;
    Ok(ResponseOutcome::Recorded(response))
}
