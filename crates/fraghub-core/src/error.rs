use fraghub_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not accepting responses")]
    NotActive,
    #[error("you have already voted")]
    AlreadyVoted,
    #[error("you have already completed this survey")]
    AlreadyResponded,
    #[error("invalid option")]
    InvalidOption,
    #[error("unanswered questions: {0:?}")]
    IncompleteSubmission(Vec<i64>),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(DbError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => CoreError::NotFound,
            other => CoreError::Database(other),
        }
    }
}
