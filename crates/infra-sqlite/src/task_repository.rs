// SQLite TaskRepository Implementation

use crate::rows::{from_millis, map_sqlx_error, to_millis, TaskRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shiftline_core::domain::{DomainError, ScheduledTask, TaskState};
use shiftline_core::error::Result;
use shiftline_core::port::TaskRepository;
use sqlx::SqlitePool;

pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledTask>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn update(&self, task: &ScheduledTask, expected: TaskState) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET state = ?, fire_at = ?, attempts = ?, last_error = ?,
                started_at = ?, finished_at = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(task.state.to_string())
        .bind(to_millis(task.fire_at))
        .bind(task.attempts)
        .bind(&task.last_error)
        .bind(task.started_at.map(to_millis))
        .bind(task.finished_at.map(to_millis))
        .bind(&task.id)
        .bind(expected.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.find_by_id(&task.id).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::not_found("ScheduledTask", task.id.clone()).into()),
        }
    }

    async fn claim(&self, id: &str, now: DateTime<Utc>) -> Result<Option<ScheduledTask>> {
        let now_ms = to_millis(now);
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE scheduled_tasks
            SET state = ?, started_at = ?
            WHERE id = ? AND state IN (?, ?) AND fire_at <= ?
            RETURNING *
            "#,
        )
        .bind(TaskState::Running.to_string())
        .bind(now_ms)
        .bind(id)
        .bind(TaskState::Pending.to_string())
        .bind(TaskState::Delivered.to_string())
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<ScheduledTask>> {
        let now_ms = to_millis(now);

        // Single statement, so two dispatchers never claim the same row
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE scheduled_tasks
            SET state = ?, started_at = ?
            WHERE id = (
                SELECT id FROM scheduled_tasks
                WHERE state = ? AND fire_at <= ?
                ORDER BY fire_at ASC, created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(TaskState::Running.to_string())
        .bind(now_ms)
        .bind(TaskState::Pending.to_string())
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn find_by_state(&self, state: TaskState) -> Result<Vec<ScheduledTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT * FROM scheduled_tasks
            WHERE state = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn find_by_subject(&self, subject_key: &str) -> Result<Vec<ScheduledTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT * FROM scheduled_tasks
            WHERE subject_key = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(subject_key)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn next_fire_at(&self) -> Result<Option<DateTime<Utc>>> {
        let next: Option<i64> =
            sqlx::query_scalar("SELECT MIN(fire_at) FROM scheduled_tasks WHERE state = ?")
                .bind(TaskState::Pending.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        next.map(|ms| from_millis("fire_at", ms)).transpose()
    }
}
