use sqlx::Row;

use nextaction_core::domain::context::{Context, ContextId};

use super::{parse_timestamp, ContextRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContextRepository {
    pool: DbPool,
}

impl SqlContextRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_context(row: &sqlx::sqlite::SqliteRow) -> Result<Context, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Context {
        id: ContextId(id),
        owner_id: user_id,
        name,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl ContextRepository for SqlContextRepository {
    async fn find_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<Option<Context>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, created_at
             FROM contexts WHERE id = ? AND user_id = ?",
        )
        .bind(&id.0)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_context(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, context: Context) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO contexts (id, user_id, name, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name",
        )
        .bind(&context.id.0)
        .bind(&context.owner_id)
        .bind(&context.name)
        .bind(context.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_owner(
        &self,
        id: &ContextId,
        owner_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM contexts WHERE id = ? AND user_id = ?")
            .bind(&id.0)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Context>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, user_id, name, created_at
             FROM contexts WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_context).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use nextaction_core::domain::context::{Context, ContextId};

    use super::SqlContextRepository;
    use crate::repositories::{ContextRepository, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations, PoolSettings};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", PoolSettings::single_connection())
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let users = SqlUserRepository::new(pool.clone());
        users.find_or_create("U1", "T001").await.expect("insert user");
        users.find_or_create("U2", "T001").await.expect("insert other user");
        pool
    }

    fn sample_context(id: &str, owner: &str, name: &str) -> Context {
        Context {
            id: ContextId(id.to_string()),
            owner_id: owner.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn contexts_are_owner_scoped() {
        let pool = setup().await;
        let repo = SqlContextRepository::new(pool);

        repo.save(sample_context("c1000001", "U1", "@home")).await.expect("save");
        repo.save(sample_context("c1000002", "U2", "@office")).await.expect("save other");

        let mine = repo.list_for_owner("U1").await.expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "@home");

        let cross = repo
            .find_for_owner(&ContextId("c1000002".to_string()), "U1")
            .await
            .expect("cross-owner lookup");
        assert!(cross.is_none());
    }
}
