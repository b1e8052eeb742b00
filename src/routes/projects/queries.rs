use sqlx::{PgPool, QueryBuilder, Result};
use uuid::Uuid;

use super::{Member, Project};
use crate::routes::scope::MembershipScope;

const PROJECT_COLUMNS: &str = "p.id, p.title, p.creator_id, p.created_at, p.updated_at";

pub async fn list_projects(pool: &PgPool, scope: &MembershipScope) -> Result<Vec<Project>> {
    let mut qb = scope.projects(PROJECT_COLUMNS);
    qb.push(" ORDER BY p.created_at DESC, p.id ASC");

    let projects = qb.build_query_as::<Project>().fetch_all(pool).await?;
    Ok(projects)
}

pub async fn find_project(pool: &PgPool, scope: &MembershipScope, id: i64) -> Result<Option<Project>> {
    let mut qb = scope.projects(PROJECT_COLUMNS);
    qb.push(" AND p.id = ");
    qb.push_bind(id);

    let project = qb.build_query_as::<Project>().fetch_optional(pool).await?;
    Ok(project)
}

/// Inserts the project and its creator's membership in one transaction.
pub async fn create_project(pool: &PgPool, creator_id: Uuid, title: &str) -> Result<Project> {
    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (title, creator_id)
        VALUES ($1, $2)
        RETURNING id, title, creator_id, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(creator_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(project.id)
    .bind(creator_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(project)
}

pub async fn update_project(
    pool: &PgPool,
    scope: &MembershipScope,
    id: i64,
    title: Option<String>,
) -> Result<Option<Project>> {
    let mut qb = QueryBuilder::new("UPDATE projects p SET updated_at = GREATEST(NOW(), p.updated_at)");
    if let Some(title) = title {
        qb.push(", title = ");
        qb.push_bind(title);
    }
    qb.push(" WHERE p.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    scope.push_project_visibility(&mut qb);
    qb.push(" RETURNING ");
    qb.push(PROJECT_COLUMNS);

    let project = qb.build_query_as::<Project>().fetch_optional(pool).await?;
    Ok(project)
}

/// Fails with a foreign-key violation while tasks still reference the project.
pub async fn delete_project(pool: &PgPool, scope: &MembershipScope, id: i64) -> Result<bool> {
    let mut qb = QueryBuilder::new("DELETE FROM projects p WHERE p.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    scope.push_project_visibility(&mut qb);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_members(pool: &PgPool, project_id: i64) -> Result<Vec<Member>> {
    let members = sqlx::query_as::<_, Member>(
        r#"
        SELECT u.id, u.email, u.email_verified_at, m.created_at, m.updated_at
        FROM project_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = $1
        ORDER BY u.email, u.id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

pub async fn add_member(pool: &PgPool, project_id: i64, user_id: Uuid) -> Result<Member> {
    let member = sqlx::query_as::<_, Member>(
        r#"
        WITH inserted AS (
            INSERT INTO project_members (project_id, user_id)
            VALUES ($1, $2)
            RETURNING user_id, created_at, updated_at
        )
        SELECT u.id, u.email, u.email_verified_at, i.created_at, i.updated_at
        FROM inserted i
        JOIN users u ON u.id = i.user_id
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(member)
}

pub async fn remove_member(pool: &PgPool, project_id: i64, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM project_members
        WHERE project_id = $1 AND user_id = $2
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
