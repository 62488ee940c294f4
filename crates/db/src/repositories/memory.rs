//! In-memory repository fakes for exercising services without SQLite.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use nextaction_core::domain::context::{Context, ContextId};
use nextaction_core::domain::export::ExportToken;
use nextaction_core::domain::project::{Project, ProjectId};
use nextaction_core::domain::task::{Task, TaskId, TaskStatus};
use nextaction_core::domain::user::User;

use super::{
    ContextRepository, ExportTokenRepository, ProjectRepository, RepositoryError, TaskRepository,
    UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_or_create(
        &self,
        slack_user_id: &str,
        slack_team_id: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let now = Utc::now();
        let user = users
            .entry(slack_user_id.to_string())
            .and_modify(|existing| {
                existing.slack_team_id = slack_team_id.to_string();
                existing.updated_at = now;
            })
            .or_insert_with(|| User {
                slack_user_id: slack_user_id.to_string(),
                slack_team_id: slack_team_id.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(user.clone())
    }

    async fn find(&self, slack_user_id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(slack_user_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_for_owner(
        &self,
        id: &TaskId,
        owner_id: &str,
    ) -> Result<Option<Task>, RepositoryError> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&id.0)
            .filter(|task| task.owner_id == owner_id)
            .cloned())
    }

    async fn save(&self, task: Task) -> Result<(), RepositoryError> {
        self.tasks.write().await.insert(task.id.0.clone(), task);
        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &TaskId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tasks = self.tasks.write().await;
        let owned = tasks.get(&id.0).map(|task| task.owner_id == owner_id).unwrap_or(false);
        if owned {
            tasks.remove(&id.0);
        }
        Ok(owned)
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let mut matched: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|task| {
                task.owner_id == owner_id && status.map(|s| task.status == s).unwrap_or(true)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let mut matched: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|task| {
                task.status == TaskStatus::Active
                    && task.due_date.map(|due| due >= from && due <= to).unwrap_or(false)
            })
            .cloned()
            .collect();
        matched.sort_by_key(|task| task.due_date);
        Ok(matched)
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        let mut matched: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|task| task.status == status)
            .cloned()
            .collect();
        matched.sort_by_key(|task| task.created_at);
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<String, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<Option<Project>, RepositoryError> {
        Ok(self
            .projects
            .read()
            .await
            .get(&id.0)
            .filter(|project| project.owner_id == owner_id)
            .cloned())
    }

    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        self.projects.write().await.insert(project.id.0.clone(), project);
        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let mut projects = self.projects.write().await;
        let owned =
            projects.get(&id.0).map(|project| project.owner_id == owner_id).unwrap_or(false);
        if owned {
            projects.remove(&id.0);
        }
        Ok(owned)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Project>, RepositoryError> {
        let mut matched: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|project| project.owner_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by_key(|project| project.created_at);
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryContextRepository {
    contexts: RwLock<HashMap<String, Context>>,
}

impl InMemoryContextRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ContextRepository for InMemoryContextRepository {
    async fn find_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<Option<Context>, RepositoryError> {
        Ok(self
            .contexts
            .read()
            .await
            .get(&id.0)
            .filter(|context| context.owner_id == owner_id)
            .cloned())
    }

    async fn save(&self, context: Context) -> Result<(), RepositoryError> {
        self.contexts.write().await.insert(context.id.0.clone(), context);
        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let mut contexts = self.contexts.write().await;
        let owned =
            contexts.get(&id.0).map(|context| context.owner_id == owner_id).unwrap_or(false);
        if owned {
            contexts.remove(&id.0);
        }
        Ok(owned)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Context>, RepositoryError> {
        let mut matched: Vec<Context> = self
            .contexts
            .read()
            .await
            .values()
            .filter(|context| context.owner_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by_key(|context| context.created_at);
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryExportTokenRepository {
    tokens: RwLock<HashMap<String, ExportToken>>,
}

impl InMemoryExportTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ExportTokenRepository for InMemoryExportTokenRepository {
    async fn find_or_create(
        &self,
        candidate: ExportToken,
    ) -> Result<ExportToken, RepositoryError> {
        let mut tokens = self.tokens.write().await;
        if let Some(existing) =
            tokens.values().find(|token| token.owner_id == candidate.owner_id)
        {
            return Ok(existing.clone());
        }
        tokens.insert(candidate.token.clone(), candidate.clone());
        Ok(candidate)
    }

    async fn find(&self, token: &str) -> Result<Option<ExportToken>, RepositoryError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}
