use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fraghub_core::error::CoreError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not accepting responses")]
    NotActive,
    #[error("you have already voted")]
    AlreadyVoted,
    #[error("you have already completed this survey")]
    AlreadyResponded,
    #[error("invalid option")]
    InvalidOption,
    #[error("please answer every question")]
    IncompleteSubmission(Vec<i64>),
    /// An engagement rejection together with the page the client should go to.
    #[error("{source}")]
    Redirect {
        source: Box<ApiError>,
        location: String,
    },
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Machine-readable error code string.
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::NotActive => "NOT_ACTIVE",
            ApiError::AlreadyVoted => "ALREADY_VOTED",
            ApiError::AlreadyResponded => "ALREADY_RESPONDED",
            ApiError::InvalidOption => "INVALID_OPTION",
            ApiError::IncompleteSubmission(_) => "INCOMPLETE_SUBMISSION",
            ApiError::Redirect { source, .. } => source.error_code(),
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::InvalidOption => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_)
            | ApiError::NotActive
            | ApiError::AlreadyVoted
            | ApiError::AlreadyResponded => StatusCode::CONFLICT,
            ApiError::IncompleteSubmission(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Redirect { source, .. } => source.status_code(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            ApiError::IncompleteSubmission(missing) => json!({ "missing": missing }),
            ApiError::Redirect { source, location } => {
                let mut details = source.details();
                details["redirect"] = json!(location);
                details
            }
            _ => Value::Null,
        }
    }

    /// Attach `location` to engagement rejections (closed, already answered,
    /// foreign option, unanswered questions). Every other error passes through
    /// untouched.
    pub fn redirect_to(self, location: impl Into<String>) -> Self {
        match self {
            ApiError::NotActive
            | ApiError::AlreadyVoted
            | ApiError::AlreadyResponded
            | ApiError::InvalidOption
            | ApiError::IncompleteSubmission(_) => ApiError::Redirect {
                source: Box::new(self),
                location: location.into(),
            },
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": code,
            "message": message,
            // Some clients still read "error"
            "error": message,
            "details": self.details(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NotFound => ApiError::NotFound,
            CoreError::Unauthorized => ApiError::Unauthorized,
            CoreError::Forbidden => ApiError::Forbidden,
            CoreError::NotActive => ApiError::NotActive,
            CoreError::AlreadyVoted => ApiError::AlreadyVoted,
            CoreError::AlreadyResponded => ApiError::AlreadyResponded,
            CoreError::InvalidOption => ApiError::InvalidOption,
            CoreError::IncompleteSubmission(missing) => ApiError::IncompleteSubmission(missing),
            CoreError::BadRequest(msg) => ApiError::BadRequest(msg),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Database(err) => ApiError::Internal(anyhow::anyhow!(err)),
            CoreError::Internal(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<fraghub_db::DbError> for ApiError {
    fn from(e: fraghub_db::DbError) -> Self {
        match e {
            fraghub_db::DbError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl From<fraghub_models::UnknownVariant> for ApiError {
    fn from(e: fraghub_models::UnknownVariant) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
