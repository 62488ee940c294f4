use chrono::Utc;
use sqlx::Row;

use nextaction_core::domain::user::User;

use super::{parse_timestamp, RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let slack_user_id: String =
        row.try_get("slack_user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let slack_team_id: String =
        row.try_get("slack_team_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        slack_user_id,
        slack_team_id,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_or_create(
        &self,
        slack_user_id: &str,
        slack_team_id: &str,
    ) -> Result<User, RepositoryError> {
        let now = Utc::now().to_rfc3339();

        // One atomic statement; concurrent first contact resolves to the
        // same row. The no-op team_id update makes RETURNING yield the row
        // on the conflict path too.
        let row = sqlx::query(
            "INSERT INTO users (slack_user_id, slack_team_id, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(slack_user_id) DO UPDATE SET
                 slack_team_id = excluded.slack_team_id,
                 updated_at = excluded.updated_at
             RETURNING slack_user_id, slack_team_id, created_at, updated_at",
        )
        .bind(slack_user_id)
        .bind(slack_team_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        row_to_user(&row)
    }

    async fn find(&self, slack_user_id: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT slack_user_id, slack_team_id, created_at, updated_at
             FROM users WHERE slack_user_id = ?",
        )
        .bind(slack_user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations, PoolSettings};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", PoolSettings::single_connection())
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn find_or_create_inserts_then_returns_existing() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let first = repo.find_or_create("U123", "T001").await.expect("create");
        assert_eq!(first.slack_user_id, "U123");
        assert_eq!(first.slack_team_id, "T001");

        let second = repo.find_or_create("U123", "T001").await.expect("find");
        assert_eq!(second.slack_user_id, "U123");
        assert_eq!(second.created_at, first.created_at, "created_at should not move");
    }

    #[tokio::test]
    async fn concurrent_find_or_create_resolves_to_one_row() {
        // In-memory sqlite with a single connection serializes the two
        // upserts; the point is that neither errors and both see one row.
        let pool = setup().await;
        let repo = Arc::new(SqlUserRepository::new(pool.clone()));

        let a = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.find_or_create("U777", "T001").await })
        };
        let b = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.find_or_create("U777", "T001").await })
        };

        a.await.expect("join").expect("upsert a");
        b.await.expect("join").expect("upsert b");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE slack_user_id = ?")
            .bind("U777")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn find_returns_none_for_unknown_user() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let missing = repo.find("U999").await.expect("find");
        assert!(missing.is_none());
    }
}
