use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Cache key for an in-progress survey: (login session id, survey id).
pub type SurveySessionKey = (String, i64);

/// Answers gathered so far for one survey in one login session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurveyProgress {
    /// question id -> choice id
    pub answers: BTreeMap<i64, i64>,
    pub completed_pages: BTreeSet<i64>,
}

impl SurveyProgress {
    /// Replace the answers for the questions of one page and mark it submitted.
    pub fn merge_page(&mut self, page: i64, page_questions: &[i64], answers: &BTreeMap<i64, i64>) {
        for question_id in page_questions {
            self.answers.remove(question_id);
        }
        self.answers
            .extend(answers.iter().map(|(question, choice)| (*question, *choice)));
        self.completed_pages.insert(page);
    }

    /// Drop answers that `is_current(question, choice)` no longer accepts,
    /// e.g. after a question or choice was deleted or moved mid-survey.
    /// Returns how many answers were dropped.
    pub fn retain_current(&mut self, mut is_current: impl FnMut(i64, i64) -> bool) -> usize {
        let before = self.answers.len();
        self.answers
            .retain(|question, choice| is_current(*question, *choice));
        before - self.answers.len()
    }
}

/// Build the progress cache; entries expire after `idle` without access.
pub fn build_survey_session_cache(
    idle: Duration,
) -> moka::future::Cache<SurveySessionKey, SurveyProgress> {
    moka::future::Cache::builder()
        .max_capacity(100_000)
        .time_to_idle(idle)
        .build()
}

/// Per-session multi-page survey accumulator.
#[derive(Clone)]
pub struct SurveySessions {
    cache: moka::future::Cache<SurveySessionKey, SurveyProgress>,
}

impl SurveySessions {
    pub fn new(idle: Duration) -> Self {
        Self {
            cache: build_survey_session_cache(idle),
        }
    }

    pub async fn get(&self, session_id: &str, survey_id: i64) -> SurveyProgress {
        self.cache
            .get(&(session_id.to_string(), survey_id))
            .await
            .unwrap_or_default()
    }

    pub async fn store(&self, session_id: &str, survey_id: i64, progress: SurveyProgress) {
        self.cache
            .insert((session_id.to_string(), survey_id), progress)
            .await;
    }

    pub async fn clear(&self, session_id: &str, survey_id: i64) {
        self.cache
            .invalidate(&(session_id.to_string(), survey_id))
            .await;
    }
}
