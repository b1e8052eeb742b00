//! Capability checks invoked at the top of each handler.
//!
//! Visibility is handled by [`super::scope::MembershipScope`]; a target that
//! reaches these checks is already known to be visible, so a refusal here is a
//! 403 rather than a 404.

use super::middleware_auth::AuthUser;
use super::projects::Project;
use super::tasks::model::Task;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
    ManageMembers,
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Tasks,
    Task(&'a Task),
    Projects,
    Project(&'a Project),
}

pub fn allows(user: &AuthUser, ability: Ability, target: Target<'_>) -> bool {
    use Ability::*;

    match (target, ability) {
        (Target::Tasks | Target::Projects, ViewAny | Create) => true,

        (Target::Task(_), View | Update) => true,
        (Target::Task(task), Delete) => {
            task.owner_id == user.0 || task.project_creator_id == Some(user.0)
        }

        (Target::Project(_), View) => true,
        (Target::Project(project), Update | Delete | ManageMembers) => project.creator_id == user.0,

        _ => false,
    }
}

pub fn authorize(user: &AuthUser, ability: Ability, target: Target<'_>) -> Result<(), ApiError> {
    if allows(user, ability, target) {
        Ok(())
    } else {
        tracing::info!(user_id = %user.0, ?ability, "capability denied");
        Err(ApiError::Forbidden)
    }
}
