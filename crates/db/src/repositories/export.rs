use sqlx::Row;

use nextaction_core::domain::export::ExportToken;

use super::{parse_timestamp, ExportTokenRepository, RepositoryError};
use crate::DbPool;

pub struct SqlExportTokenRepository {
    pool: DbPool,
}

impl SqlExportTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_token(row: &sqlx::sqlite::SqliteRow) -> Result<ExportToken, RepositoryError> {
    let token: String =
        row.try_get("token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ExportToken { token, owner_id: user_id, created_at: parse_timestamp(&created_at_str)? })
}

#[async_trait::async_trait]
impl ExportTokenRepository for SqlExportTokenRepository {
    async fn find_or_create(
        &self,
        candidate: ExportToken,
    ) -> Result<ExportToken, RepositoryError> {
        // One atomic statement against the unique user_id index. The no-op
        // update makes RETURNING yield the surviving row on the conflict
        // path, so a second mint comes back with the original token.
        let row = sqlx::query(
            "INSERT INTO export_tokens (token, user_id, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 user_id = excluded.user_id
             RETURNING token, user_id, created_at",
        )
        .bind(&candidate.token)
        .bind(&candidate.owner_id)
        .bind(candidate.created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        row_to_token(&row)
    }

    async fn find(&self, token: &str) -> Result<Option<ExportToken>, RepositoryError> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at FROM export_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_token(r)?)),
            None => Ok(None),
        }
    }
}
