pub mod queries;
pub mod routes;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::validation::{Validator, MAX_TITLE_LENGTH};

// MODELS

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project member: the user joined with its membership row. Only `id` and
/// `email` leave the service.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

// REQUESTS

#[derive(Debug, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub title: String,
}

impl CreateProjectRequest {
    pub fn validate(payload: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut v = Validator::new(payload);
        let title = v.required_string("title", MAX_TITLE_LENGTH).unwrap_or_default();
        v.finish(Self { title })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
}

impl UpdateProjectRequest {
    pub fn validate(payload: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut v = Validator::new(payload);
        let title = v.sometimes_string("title", MAX_TITLE_LENGTH);
        v.prohibited("creator_id");
        v.finish(Self { title })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

impl AddMemberRequest {
    pub fn validate(payload: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut v = Validator::new(payload);
        let user_id = v.required_uuid("user_id").unwrap_or_default();
        v.finish(Self { user_id })
    }
}
