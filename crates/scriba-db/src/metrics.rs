//! Usage-metric repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use scriba_core::{Error, MetricsRepository, Result, TokenUsage, UsageMetric};

/// PostgreSQL implementation of [`MetricsRepository`].
#[derive(Clone)]
pub struct PgMetricsRepository {
    pool: PgPool,
}

impl PgMetricsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsRepository for PgMetricsRepository {
    async fn record(&self, document_id: i64, usage: TokenUsage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_metrics (document_id, prompt_tokens, completion_tokens, total_tokens)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(document_id)
        .bind(usage.prompt_tokens)
        .bind(usage.completion_tokens)
        .bind(usage.total_tokens)
        .execute(&self.pool)
        .await
        .map_err(Error::Ledger)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UsageMetric>> {
        let rows = sqlx::query(
            r#"
            SELECT document_id, prompt_tokens, completion_tokens, total_tokens, created_at
            FROM usage_metrics
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Ledger)?;

        Ok(rows
            .into_iter()
            .map(|row| UsageMetric {
                document_id: row.get("document_id"),
                prompt_tokens: row.get("prompt_tokens"),
                completion_tokens: row.get("completion_tokens"),
                total_tokens: row.get("total_tokens"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
