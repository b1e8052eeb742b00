use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::routes::tasks::shaper::QueryError;

pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// Per-field validation messages, ordered by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when nothing was recorded, otherwise a 422.
    pub fn into_result<T>(self, value: T) -> Result<T, ApiError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    #[error(transparent)]
    InvalidQuery(#[from] QueryError),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("This action is unauthorized.")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Validation(errors) => json!({
                "message": VALIDATION_MESSAGE,
                "errors": errors,
            }),
            Self::InvalidQuery(err) => {
                let mut errors = serde_json::Map::new();
                errors.insert(err.parameter().to_string(), json!([err.to_string()]));
                json!({ "message": err.to_string(), "errors": errors })
            }
            // the underlying cause is logged, never returned
            Self::Database(_) => json!({ "message": "Server Error" }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn has_code(e: &sqlx::Error, code: &str) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|c| c == code)
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    has_code(e, UNIQUE_VIOLATION)
}

pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    has_code(e, FOREIGN_KEY_VIOLATION)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "database error"),
            Self::Unauthenticated(reason) => tracing::warn!(reason = %reason, "unauthenticated request"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(ApiError::Forbidden, StatusCode::FORBIDDEN)]
    #[case(ApiError::NotFound("Task"), StatusCode::NOT_FOUND)]
    #[case(ApiError::Unauthenticated("missing token"), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Conflict("busy".into()), StatusCode::CONFLICT)]
    #[case(ApiError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ApiError::InvalidQuery(QueryError::InvalidPageValue("abc".into())), StatusCode::BAD_REQUEST)]
    fn test_status_codes(#[case] err: ApiError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "The title field is required.");
        errors.add("is_done", "The is_done field must be true or false.");

        let (status, body) = body_json(ApiError::Validation(errors)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], VALIDATION_MESSAGE);
        assert_eq!(body["errors"]["title"][0], "The title field is required.");
        assert!(body["errors"]["is_done"].is_array());
    }

    #[tokio::test]
    async fn test_query_error_names_parameter() {
        let err = ApiError::from(QueryError::InvalidPageValue("abc".into()));

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["page"][0], "The page must be an integer.");
        assert_eq!(body["message"], "The page must be an integer.");
    }

    #[tokio::test]
    async fn test_database_error_is_opaque() {
        let (status, body) = body_json(ApiError::Database(sqlx::Error::PoolTimedOut)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "message": "Server Error" }));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(7).unwrap(), 7);

        let mut errors = ValidationErrors::new();
        errors.add("title", "bad");
        assert!(matches!(errors.into_result(()), Err(ApiError::Validation(_))));
    }
}
