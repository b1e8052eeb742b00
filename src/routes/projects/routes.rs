use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{queries, AddMemberRequest, CreateProjectRequest, Project, UpdateProjectRequest};
use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError};
use crate::routes::envelope::Item;
use crate::routes::middleware_auth::AuthUser;
use crate::routes::policy::{authorize, Ability, Target};
use crate::routes::scope::MembershipScope;
use crate::routes::validation::json_object;
use crate::state::AppState;

async fn load_project(
    state: &AppState,
    scope: &MembershipScope,
    raw_id: &str,
) -> Result<Project, ApiError> {
    let id: i64 = raw_id.parse().map_err(|_| ApiError::NotFound("Project"))?;

    queries::find_project(&state.db, scope, id)
        .await?
        .ok_or(ApiError::NotFound("Project"))
}

// HANDLERS

/// Create a project; the creator becomes its first member
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Ability::Create, Target::Projects)?;
    let payload = CreateProjectRequest::validate(&json_object(body)?)?;

    let project = queries::create_project(&state.db, user.0, &payload.title).await?;
    info!(project_id = project.id, creator_id = %user.0, "project created");

    Ok((StatusCode::CREATED, Json(Item::new(project))))
}

/// List the projects the caller is a member of
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Ability::ViewAny, Target::Projects)?;

    let scope = MembershipScope::for_user(&user);
    let projects = queries::list_projects(&state.db, &scope).await?;

    Ok(Json(Item::new(projects)))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::View, Target::Project(&project))?;

    Ok(Json(Item::new(project)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::Update, Target::Project(&project))?;

    let payload = UpdateProjectRequest::validate(&json_object(body)?)?;

    let project = queries::update_project(&state.db, &scope, project.id, payload.title)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;
    info!(project_id = project.id, "project updated");

    Ok(Json(Item::new(project)))
}

/// Delete a project (memberships cascade, tasks must be removed first)
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::Delete, Target::Project(&project))?;

    let deleted = match queries::delete_project(&state.db, &scope, project.id).await {
        Ok(deleted) => deleted,
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(ApiError::Conflict(
                "The project still has tasks and cannot be deleted.".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !deleted {
        return Err(ApiError::NotFound("Project"));
    }
    info!(project_id = project.id, "project deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::View, Target::Project(&project))?;

    let members = queries::list_members(&state.db, project.id).await?;
    Ok(Json(Item::new(members)))
}

pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::ManageMembers, Target::Project(&project))?;

    let payload = AddMemberRequest::validate(&json_object(body)?)?;

    let member = match queries::add_member(&state.db, project.id, payload.user_id).await {
        Ok(member) => member,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "The user is already a member of this project.".to_string(),
            ));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(ApiError::validation_field(
                "user_id",
                "The selected user id is invalid.",
            ));
        }
        Err(e) => return Err(e.into()),
    };
    info!(project_id = project.id, user_id = %member.id, "member added");

    Ok((StatusCode::CREATED, Json(Item::new(member))))
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, member_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = MembershipScope::for_user(&user);
    let project = load_project(&state, &scope, &project_id).await?;
    authorize(&user, Ability::ManageMembers, Target::Project(&project))?;

    let member_id = Uuid::parse_str(&member_id).map_err(|_| ApiError::NotFound("Member"))?;
    if member_id == project.creator_id {
        return Err(ApiError::Conflict(
            "The project creator cannot be removed from the project.".to_string(),
        ));
    }

    if !queries::remove_member(&state.db, project.id, member_id).await? {
        return Err(ApiError::NotFound("Member"));
    }
    info!(project_id = project.id, user_id = %member_id, "member removed");

    Ok(StatusCode::NO_CONTENT)
}
