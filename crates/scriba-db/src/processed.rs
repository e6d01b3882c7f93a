//! Processed-document repository implementation.
//!
//! Presence of a row here is the sole idempotency signal for the pipeline:
//! a document with a matching row is never re-analyzed until it is reset.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use scriba_core::{Error, ProcessedDocument, ProcessedRepository, Result};

/// PostgreSQL implementation of [`ProcessedRepository`].
#[derive(Clone)]
pub struct PgProcessedRepository {
    pool: PgPool,
}

impl PgProcessedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedRepository for PgProcessedRepository {
    async fn is_processed(&self, document_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM processed_documents WHERE document_id = $1)",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Ledger)?;
        Ok(exists)
    }

    async fn upsert(&self, document_id: i64, title: Option<&str>) -> Result<()> {
        // A conflicting insert only refreshes last_updated; the first
        // processed_at is preserved for the record's lifetime.
        sqlx::query(
            r#"
            INSERT INTO processed_documents (document_id, title)
            VALUES ($1, $2)
            ON CONFLICT (document_id) DO UPDATE SET
                title = EXCLUDED.title,
                last_updated = now()
            "#,
        )
        .bind(document_id)
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(Error::Ledger)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessedDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT document_id, title, processed_at, last_updated
            FROM processed_documents
            ORDER BY processed_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Ledger)?;

        Ok(rows
            .into_iter()
            .map(|row| ProcessedDocument {
                document_id: row.get("document_id"),
                title: row.get("title"),
                processed_at: row.get("processed_at"),
                last_updated: row.get("last_updated"),
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_documents")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(count)
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        if document_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM processed_documents WHERE document_id = ANY($1)")
            .bind(document_ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM processed_documents")
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }
}
