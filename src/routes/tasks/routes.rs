use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::info;

use super::dto::{CreateTask, TaskResource, UpdateTask};
use super::model::Task;
use super::queries;
use super::shaper::TaskListQuery;
use crate::error::{is_foreign_key_violation, ApiError};
use crate::routes::envelope::{Item, Paginated};
use crate::routes::middleware_auth::AuthUser;
use crate::routes::policy::{authorize, Ability, Target};
use crate::routes::scope::MembershipScope;
use crate::routes::validation::json_object;
use crate::state::AppState;

/// Loads a visible task or fails with 404. Ids that are not integers cannot
/// exist, so they are reported the same way.
async fn load_task(state: &AppState, scope: &MembershipScope, raw_id: &str) -> Result<Task, ApiError> {
    let id: i64 = raw_id.parse().map_err(|_| ApiError::NotFound("Task"))?;

    queries::find_task(&state.db, scope, id)
        .await?
        .ok_or(ApiError::NotFound("Task"))
}

fn invalid_project() -> ApiError {
    ApiError::validation_field("project_id", "The selected project id is invalid.")
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Ability::ViewAny, Target::Tasks)?;
    let query = TaskListQuery::from_params(&params)?;

    let scope = MembershipScope::for_user(&user);
    let (tasks, total) = queries::list_tasks(&state.db, &scope, &query).await?;

    let page = Paginated::new(tasks, query.page, total, uri.path(), &query.link_pairs())
        .map(TaskResource::from);
    Ok(Json(page))
}

pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let task = load_task(&state, &scope, &id).await?;
    authorize(&user, Ability::View, Target::Task(&task))?;

    Ok(Json(Item::new(TaskResource::from(task))))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Ability::Create, Target::Tasks)?;
    let input = CreateTask::validate(&json_object(body)?)?;

    let scope = MembershipScope::for_user(&user);
    let in_project = input.project_id.is_some();
    let task = match queries::create_task(&state.db, &scope, input).await {
        Ok(Some(task)) => task,
        // project is missing or the caller is not a member
        Ok(None) => return Err(invalid_project()),
        Err(e) if in_project && is_foreign_key_violation(&e) => return Err(invalid_project()),
        Err(e) => return Err(e.into()),
    };
    info!(task_id = task.id, owner_id = %task.owner_id, "task created");

    Ok((StatusCode::CREATED, Json(Item::new(TaskResource::from(task)))))
}

/// Serves both PUT and PATCH; absent fields are left unchanged.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let task = load_task(&state, &scope, &id).await?;
    authorize(&user, Ability::Update, Target::Task(&task))?;

    let changes = UpdateTask::validate(&json_object(body)?)?;

    let task = queries::update_task(&state.db, &scope, task.id, changes)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    info!(task_id = task.id, "task updated");

    Ok(Json(Item::new(TaskResource::from(task))))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let task = load_task(&state, &scope, &id).await?;
    authorize(&user, Ability::Delete, Target::Task(&task))?;

    if !queries::delete_task(&state.db, &scope, task.id).await? {
        return Err(ApiError::NotFound("Task"));
    }
    info!(task_id = task.id, "task deleted");

    Ok(StatusCode::NO_CONTENT)
}
