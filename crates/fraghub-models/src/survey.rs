use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceResult {
    pub choice_id: i64,
    pub text: String,
    pub votes: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionResult {
    pub question_id: i64,
    pub text: String,
    pub page: i64,
    pub total_votes: i64,
    pub choices: Vec<ChoiceResult>,
}

/// Where a page submission left the respondent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Next { page: i64 },
    Complete,
}
