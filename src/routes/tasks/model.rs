use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

/// A task row joined with its project's creator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub owner_id: Uuid,
    pub project_id: Option<i64>,
    pub project_creator_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
