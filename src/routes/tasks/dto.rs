use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::model::Task;
use crate::error::ApiError;
use crate::routes::validation::{Validator, MAX_TITLE_LENGTH};

/// Validated body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub project_id: Option<i64>,
}

impl CreateTask {
    pub fn validate(payload: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut v = Validator::new(payload);

        let title = v.required_string("title", MAX_TITLE_LENGTH);
        let description = v.nullable_string("description").flatten();
        let is_done = v.boolean("is_done").unwrap_or(false);
        let project_id = v.nullable_integer("project_id").flatten();

        let title = title.unwrap_or_default();
        v.finish(Self {
            title,
            description,
            is_done,
            project_id,
        })
    }
}

/// Validated body of `PUT|PATCH /tasks/{id}`. Absent fields stay untouched;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub is_done: Option<bool>,
}

impl UpdateTask {
    pub fn validate(payload: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut v = Validator::new(payload);

        let title = v.sometimes_string("title", MAX_TITLE_LENGTH);
        let description = v.nullable_string("description");
        let is_done = v.boolean("is_done");
        v.prohibited("project_id");

        v.finish(Self {
            title,
            description,
            is_done,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResource {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResource {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            is_done: t.is_done,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}
