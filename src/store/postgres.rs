use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{ConsumeOutcome, HashMatcher, RefreshTokenRecord, RefreshTokenRepository};
use crate::error::AppError;

type RecordRow = (String, String, String, DateTime<Utc>);

fn into_record((user_id, token_hash, client_ip, created_at): RecordRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        user_id,
        token_hash,
        client_ip,
        created_at,
    }
}

/// Postgres-backed repository over the `refresh_tokens` table
#[derive(Clone)]
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn insert(
        &self,
        record: &RefreshTokenRecord,
        replace_existing: bool,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if replace_existing {
            let removed = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
                .bind(&record.user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tracing::debug!(user_id = %record.user_id, removed, "Replaced previous refresh tokens");
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, refresh_token_hash, client_ip, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.token_hash)
        .bind(&record.client_ip)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn consume_latest(
        &self,
        user_id: &str,
        matches: &HashMatcher<'_>,
    ) -> Result<ConsumeOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // The row lock makes concurrent consumers of the same record queue up
        // behind this transaction; they re-read after commit and find nothing.
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT user_id, refresh_token_hash, client_ip, created_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match row {
            Some(row) => into_record(row),
            None => {
                tx.rollback().await?;
                return Ok(ConsumeOutcome::NotFound);
            }
        };

        if !matches(&record.token_hash)? {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::Mismatch);
        }

        let deleted = sqlx::query(
            "DELETE FROM refresh_tokens WHERE user_id = $1 AND refresh_token_hash = $2",
        )
        .bind(&record.user_id)
        .bind(&record.token_hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(ConsumeOutcome::Vanished);
        }

        tx.commit().await?;
        Ok(ConsumeOutcome::Consumed(record))
    }

    async fn latest(&self, user_id: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT user_id, refresh_token_hash, client_ip, created_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
