use chrono::{DateTime, Utc};
use sqlx::Row;

use nextaction_core::domain::context::ContextId;
use nextaction_core::domain::project::ProjectId;
use nextaction_core::domain::task::{
    EnergyLevel, Priority, Task, TaskId, TaskStatus, TimeEstimate,
};

use super::{parse_timestamp, RepositoryError, TaskRepository};
use crate::DbPool;

pub struct SqlTaskRepository {
    pool: DbPool,
}

impl SqlTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, description, project_id, context_id, due_date,
                            priority, status, completed_at, delegated_to, time_estimate,
                            energy_level, created_at, updated_at";

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let project_id: Option<String> =
        row.try_get("project_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let context_id: Option<String> =
        row.try_get("context_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let due_date_str: Option<String> =
        row.try_get("due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority_str: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let completed_at_str: Option<String> =
        row.try_get("completed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegated_to: Option<String> =
        row.try_get("delegated_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let time_estimate_str: Option<String> =
        row.try_get("time_estimate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let energy_level_str: Option<String> =
        row.try_get("energy_level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = TaskStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown task status `{status_str}`")))?;

    Ok(Task {
        id: TaskId(id),
        owner_id: user_id,
        title,
        description,
        project_id: project_id.map(ProjectId),
        context_id: context_id.map(ContextId),
        due_date: due_date_str.as_deref().map(parse_timestamp).transpose()?,
        priority: Priority::parse(&priority_str).unwrap_or_default(),
        status,
        completed_at: completed_at_str.as_deref().map(parse_timestamp).transpose()?,
        delegated_to,
        time_estimate: time_estimate_str.as_deref().and_then(TimeEstimate::parse),
        energy_level: energy_level_str.as_deref().and_then(EnergyLevel::parse),
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn find_for_owner(
        &self,
        id: &TaskId,
        owner_id: &str,
    ) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"
        ))
        .bind(&id.0)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_task(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, task: Task) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, description, project_id, context_id,
                                due_date, priority, status, completed_at, delegated_to,
                                time_estimate, energy_level, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 project_id = excluded.project_id,
                 context_id = excluded.context_id,
                 due_date = excluded.due_date,
                 priority = excluded.priority,
                 status = excluded.status,
                 completed_at = excluded.completed_at,
                 delegated_to = excluded.delegated_to,
                 time_estimate = excluded.time_estimate,
                 energy_level = excluded.energy_level,
                 updated_at = excluded.updated_at",
        )
        .bind(&task.id.0)
        .bind(&task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.project_id.as_ref().map(|p| p.0.as_str()))
        .bind(task.context_id.as_ref().map(|c| c.0.as_str()))
        .bind(task.due_date.map(|dt| dt.to_rfc3339()))
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(&task.delegated_to)
        .bind(task.time_estimate.map(|t| t.as_str()))
        .bind(task.energy_level.map(|e| e.as_str()))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &TaskId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(&id.0)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE user_id = ? AND status = ?
                 ORDER BY created_at DESC"
            ))
            .bind(owner_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE user_id = ?
                 ORDER BY created_at DESC"
            ))
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_task).collect::<Result<Vec<_>, _>>()
    }

    async fn list_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE status = 'active'
               AND due_date IS NOT NULL
               AND datetime(due_date) >= datetime(?)
               AND datetime(due_date) <= datetime(?)
             ORDER BY datetime(due_date) ASC"
        ))
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect::<Result<Vec<_>, _>>()
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE status = ?
             ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect::<Result<Vec<_>, _>>()
    }
}
