use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use nextaction_core::domain::context::{Context, ContextId};
use nextaction_core::domain::export::ExportToken;
use nextaction_core::domain::project::{Project, ProjectId};
use nextaction_core::domain::task::{Task, TaskId, TaskStatus};
use nextaction_core::domain::user::User;

pub mod context;
pub mod export;
pub mod memory;
pub mod project;
pub mod task;
pub mod user;

pub use context::SqlContextRepository;
pub use export::SqlExportTokenRepository;
pub use memory::{
    InMemoryContextRepository, InMemoryExportTokenRepository, InMemoryProjectRepository,
    InMemoryTaskRepository, InMemoryUserRepository,
};
pub use project::SqlProjectRepository;
pub use task::SqlTaskRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Timestamps are stored as RFC 3339 text. A row that does not parse is
/// corrupt and surfaces as a decode error instead of a made-up value.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("bad timestamp `{value}`: {err}")))
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Idempotent identity upsert: one statement, safe under concurrent
    /// first contact from the same user.
    async fn find_or_create(
        &self,
        slack_user_id: &str,
        slack_team_id: &str,
    ) -> Result<User, RepositoryError>;

    async fn find(&self, slack_user_id: &str) -> Result<Option<User>, RepositoryError>;
}

/// Every read and delete is scoped to an owner so that one user can never
/// see or touch another user's records.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find_for_owner(
        &self,
        id: &TaskId,
        owner_id: &str,
    ) -> Result<Option<Task>, RepositoryError>;

    async fn save(&self, task: Task) -> Result<(), RepositoryError>;

    async fn delete_for_owner(&self, id: &TaskId, owner_id: &str)
        -> Result<bool, RepositoryError>;

    async fn list_for_owner(
        &self,
        owner_id: &str,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, RepositoryError>;

    /// Active tasks across all owners with a due date inside `[from, to]`.
    async fn list_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError>;

    /// All tasks across all owners in the given status, oldest first.
    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<Option<Project>, RepositoryError>;

    async fn save(&self, project: Project) -> Result<(), RepositoryError>;

    async fn delete_for_owner(
        &self,
        id: &ProjectId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Project>, RepositoryError>;
}

#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn find_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<Option<Context>, RepositoryError>;

    async fn save(&self, context: Context) -> Result<(), RepositoryError>;

    async fn delete_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Context>, RepositoryError>;
}

#[async_trait]
pub trait ExportTokenRepository: Send + Sync {
    /// Returns the owner's existing grant when one exists; otherwise the
    /// candidate is persisted and returned. Each user holds at most one
    /// export token for the lifetime of their account.
    async fn find_or_create(
        &self,
        candidate: ExportToken,
    ) -> Result<ExportToken, RepositoryError>;

    async fn find(&self, token: &str) -> Result<Option<ExportToken>, RepositoryError>;
}
