use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: User and profile errors
/// - E2xxx: Like and match errors
/// - E3xxx: Messaging errors
/// - E4xxx: Moderation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    StoreFailure,
    Conflict,

    // Users & profiles (E1xxx)
    UserNotFound,
    UsernameTaken,
    EmailTaken,
    ProfileNotFound,

    // Likes & matches (E2xxx)
    DuplicateLike,
    CannotLikeSelf,

    // Messaging (E3xxx)
    CannotMessageSelf,
    InvalidMessageType,

    // Moderation (E4xxx)
    UserBlocked,
    AlreadyBlocked,
    CannotBlockSelf,
    CannotReportSelf,
    ReportNotFound,
    InvalidReportTransition,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::StoreFailure => "E0004",
            Self::Conflict => "E0006",

            // Users & profiles
            Self::UserNotFound => "E1001",
            Self::UsernameTaken => "E1002",
            Self::EmailTaken => "E1003",
            Self::ProfileNotFound => "E1004",

            // Likes & matches
            Self::DuplicateLike => "E2001",
            Self::CannotLikeSelf => "E2002",

            // Messaging
            Self::CannotMessageSelf => "E3001",
            Self::InvalidMessageType => "E3002",

            // Moderation
            Self::UserBlocked => "E4001",
            Self::AlreadyBlocked => "E4002",
            Self::CannotBlockSelf => "E4003",
            Self::CannotReportSelf => "E4004",
            Self::ReportNotFound => "E4005",
            Self::InvalidReportTransition => "E4006",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::CannotLikeSelf
            | Self::CannotMessageSelf | Self::InvalidMessageType => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::ProfileNotFound
            | Self::ReportNotFound => StatusCode::NOT_FOUND,
            Self::UserBlocked | Self::CannotBlockSelf | Self::CannotReportSelf => StatusCode::FORBIDDEN,
            Self::Conflict | Self::UsernameTaken | Self::EmailTaken | Self::DuplicateLike
            | Self::AlreadyBlocked | Self::InvalidReportTransition => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn store_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreFailure, message)
    }

    /// The error code this error will be reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::StoreFailure,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), "{message}");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0004", "database error"),
                    ),
                }
            }
            AppError::Validation(errors) => {
                let details = serde_json::to_value(errors.field_errors())
                    .unwrap_or(serde_json::Value::Null);
                (
                    StatusCode::BAD_REQUEST,
                    ApiErrorResponse::new("E0002", "invalid request payload").with_details(details),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Malformed request input (body, path or query) is reported as a validation
/// failure, with axum's own explanation under `details.reason`.
fn rejected(part: &str, reason: String) -> AppError {
    AppError::with_details(
        ErrorCode::ValidationError,
        format!("invalid request {part}"),
        serde_json::json!({ "reason": reason }),
    )
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejected("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        rejected("path", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejected("query", rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn duplicate_like_is_conflict() {
        assert_eq!(ErrorCode::DuplicateLike.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DuplicateLike.code(), "E2001");
    }

    #[test]
    fn store_failure_is_server_error() {
        assert_eq!(ErrorCode::StoreFailure.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn known_error_json_structure() {
        let (status, value) = body_json(AppError::new(ErrorCode::UserNotFound, "user 7 not found")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E1001");
        assert_eq!(value["error"]["message"], "user 7 not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn database_not_found_maps_to_404() {
        let (status, value) = body_json(AppError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"]["code"], "E0003");
    }

    #[tokio::test]
    async fn rejected_input_is_a_validation_error_with_reason() {
        let (status, value) = body_json(rejected("body", "missing field `content`".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"]["code"], "E0002");
        assert_eq!(value["error"]["message"], "invalid request body");
        assert_eq!(value["error"]["details"]["reason"], "missing field `content`");
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1))]
        name: String,
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let err = Payload { name: String::new() }.validate().unwrap_err();
        let (status, value) = body_json(AppError::from(err)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"]["code"], "E0002");
        assert!(value["error"]["details"]["name"].is_array());
    }
}
