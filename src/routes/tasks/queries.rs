use sqlx::{PgPool, Postgres, QueryBuilder, Result};

use super::dto::{CreateTask, UpdateTask};
use super::model::Task;
use super::shaper::TaskListQuery;
use crate::routes::scope::MembershipScope;

const TASK_COLUMNS: &str = "t.id, t.owner_id, t.project_id, p.creator_id AS project_creator_id, \
                            t.title, t.description, t.is_done, t.created_at, t.updated_at";

pub fn build_count(scope: &MembershipScope, query: &TaskListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = scope.tasks("COUNT(*)");
    query.filters.push_conditions(&mut qb);
    qb
}

pub fn build_page(scope: &MembershipScope, query: &TaskListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = scope.tasks(TASK_COLUMNS);
    query.filters.push_conditions(&mut qb);
    query.push_order(&mut qb);
    query.page.push_limit(&mut qb);
    qb
}

pub fn build_update(scope: &MembershipScope, id: i64, changes: UpdateTask) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "WITH updated AS (UPDATE tasks t SET updated_at = GREATEST(NOW(), t.updated_at)",
    );

    if let Some(title) = changes.title {
        qb.push(", title = ");
        qb.push_bind(title);
    }
    if let Some(description) = changes.description {
        qb.push(", description = ");
        qb.push_bind(description);
    }
    if let Some(is_done) = changes.is_done {
        qb.push(", is_done = ");
        qb.push_bind(is_done);
    }

    qb.push(" WHERE t.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    scope.push_task_visibility(&mut qb);
    qb.push(" RETURNING t.*) SELECT ");
    qb.push(TASK_COLUMNS);
    qb.push(" FROM updated t LEFT JOIN projects p ON p.id = t.project_id");
    qb
}

/// Returns the requested page together with the total matching row count.
pub async fn list_tasks(
    pool: &PgPool,
    scope: &MembershipScope,
    query: &TaskListQuery,
) -> Result<(Vec<Task>, i64)> {
    let mut count = build_count(scope, query);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    // past the last page: skip the second round-trip
    if query.page.offset() >= total {
        return Ok((Vec::new(), total));
    }

    let mut qb = build_page(scope, query);
    let tasks = qb.build_query_as::<Task>().fetch_all(pool).await?;

    Ok((tasks, total))
}

pub async fn find_task(pool: &PgPool, scope: &MembershipScope, id: i64) -> Result<Option<Task>> {
    let mut qb = scope.tasks(TASK_COLUMNS);
    qb.push(" AND t.id = ");
    qb.push_bind(id);

    let task = qb.build_query_as::<Task>().fetch_optional(pool).await?;
    Ok(task)
}

/// Inserts only when the task is personal or the owner is a member of its
/// project; `None` otherwise.
const INSERT_TASK: &str = r#"
    INSERT INTO tasks (owner_id, project_id, title, description, is_done)
    SELECT $1::UUID, $2::BIGINT, $3::TEXT, $4::TEXT, $5::BOOLEAN
    WHERE $2::BIGINT IS NULL
       OR EXISTS (
           SELECT 1 FROM project_members m
           WHERE m.project_id = $2::BIGINT AND m.user_id = $1::UUID
       )
    RETURNING *
"#;

pub async fn create_task(pool: &PgPool, scope: &MembershipScope, input: CreateTask) -> Result<Option<Task>> {
    let sql = format!(
        r#"
        WITH inserted AS ({INSERT_TASK})
        SELECT {TASK_COLUMNS}
        FROM inserted t
        LEFT JOIN projects p ON p.id = t.project_id
        "#
    );

    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(scope.user_id())
        .bind(input.project_id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.is_done)
        .fetch_optional(pool)
        .await?;

    Ok(task)
}

pub async fn update_task(
    pool: &PgPool,
    scope: &MembershipScope,
    id: i64,
    changes: UpdateTask,
) -> Result<Option<Task>> {
    let mut qb = build_update(scope, id, changes);
    let task = qb.build_query_as::<Task>().fetch_optional(pool).await?;
    Ok(task)
}

/// Returns whether a row was removed.
pub async fn delete_task(pool: &PgPool, scope: &MembershipScope, id: i64) -> Result<bool> {
    let mut qb = QueryBuilder::new("DELETE FROM tasks t WHERE t.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    scope.push_task_visibility(&mut qb);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
