//! Membership scoping for every task and project query.
//!
//! A [`MembershipScope`] is built from the authenticated user and is the only
//! way to open a task or project statement: [`MembershipScope::tasks`] and
//! [`MembershipScope::projects`] start the `WHERE` clause with the visibility
//! predicate, and mutations splice it in through the `push_*_visibility`
//! helpers. Nothing in the request can widen or drop it.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::middleware_auth::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipScope {
    user_id: Uuid,
}

impl MembershipScope {
    pub fn for_user(user: &AuthUser) -> Self {
        Self { user_id: user.0 }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// `SELECT {columns} FROM tasks t LEFT JOIN projects p ... WHERE <visible>`.
    ///
    /// Callers append further conditions with ` AND ...`.
    pub fn tasks(&self, columns: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {columns} FROM tasks t LEFT JOIN projects p ON p.id = t.project_id WHERE "
        ));
        self.push_task_visibility(&mut qb);
        qb
    }

    /// A task is visible to its owner while it has no project, and to every
    /// member of its project otherwise.
    pub fn push_task_visibility(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push("((t.project_id IS NULL AND t.owner_id = ");
        qb.push_bind(self.user_id);
        qb.push(") OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = t.project_id AND m.user_id = ");
        qb.push_bind(self.user_id);
        qb.push("))");
    }

    /// `SELECT {columns} FROM projects p WHERE <member>`.
    pub fn projects(&self, columns: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {columns} FROM projects p WHERE "));
        self.push_project_visibility(&mut qb);
        qb
    }

    pub fn push_project_visibility(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push("EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ");
        qb.push_bind(self.user_id);
        qb.push(")");
    }
}
