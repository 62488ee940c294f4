use sqlx::Row;

use nextaction_core::domain::project::{Project, ProjectId};

use super::{parse_timestamp, ProjectRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProjectRepository {
    pool: DbPool,
}

impl SqlProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> Result<Project, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Project {
        id: ProjectId(id),
        owner_id: user_id,
        name,
        description,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn find_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, description, created_at, updated_at
             FROM projects WHERE id = ? AND user_id = ?",
        )
        .bind(&id.0)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_project(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO projects (id, user_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 updated_at = excluded.updated_at",
        )
        .bind(&project.id.0)
        .bind(&project.owner_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
            .bind(&id.0)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Project>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, user_id, name, description, created_at, updated_at
             FROM projects WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_project).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use nextaction_core::domain::project::{Project, ProjectId};
    use nextaction_core::domain::task::{Priority, Task, TaskId, TaskStatus};

    use super::SqlProjectRepository;
    use crate::repositories::{
        ProjectRepository, SqlTaskRepository, SqlUserRepository, TaskRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations, PoolSettings};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", PoolSettings::single_connection())
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let users = SqlUserRepository::new(pool.clone());
        users.find_or_create("U1", "T001").await.expect("insert user");
        pool
    }

    fn sample_project(id: &str, owner: &str, name: &str) -> Project {
        let now = Utc::now();
        Project {
            id: ProjectId(id.to_string()),
            owner_id: owner.to_string(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_list_and_delete() {
        let pool = setup().await;
        let repo = SqlProjectRepository::new(pool);

        repo.save(sample_project("p1000001", "U1", "Apartment move")).await.expect("save 1");
        repo.save(sample_project("p1000002", "U1", "Side business")).await.expect("save 2");

        let listed = repo.list_for_owner("U1").await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Apartment move");

        let deleted = repo
            .delete_for_owner(&ProjectId("p1000001".to_string()), "U1")
            .await
            .expect("delete");
        assert!(deleted);
        assert_eq!(repo.list_for_owner("U1").await.expect("list again").len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_project_detaches_its_tasks() {
        let pool = setup().await;
        let projects = SqlProjectRepository::new(pool.clone());
        let tasks = SqlTaskRepository::new(pool);

        projects.save(sample_project("p1000001", "U1", "Apartment move")).await.expect("save");

        let now = Utc::now();
        tasks
            .save(Task {
                id: TaskId("t1000001".to_string()),
                owner_id: "U1".to_string(),
                title: "Book movers".to_string(),
                description: None,
                project_id: Some(ProjectId("p1000001".to_string())),
                context_id: None,
                due_date: None,
                priority: Priority::default(),
                status: TaskStatus::Active,
                completed_at: None,
                delegated_to: None,
                time_estimate: None,
                energy_level: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("save task");

        projects
            .delete_for_owner(&ProjectId("p1000001".to_string()), "U1")
            .await
            .expect("delete project");

        let task = tasks
            .find_for_owner(&TaskId("t1000001".to_string()), "U1")
            .await
            .expect("find task")
            .expect("task survives project deletion");
        assert!(task.project_id.is_none(), "project reference should be cleared");
    }
}
