//! Annotation-history repository implementation.
//!
//! Append-only: a document that is reset and reprocessed gains a new row
//! each time, so the full annotation lineage stays queryable.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use scriba_core::{Error, HistoryEntry, HistoryRepository, Result};

/// PostgreSQL implementation of [`HistoryRepository`].
#[derive(Clone)]
pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_row(row: sqlx::postgres::PgRow) -> HistoryEntry {
    HistoryEntry {
        id: row.get("id"),
        document_id: row.get("document_id"),
        tags: row.get::<Json<Vec<i64>>, _>("tags").0,
        title: row.get("title"),
        correspondent: row.get("correspondent"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn append(
        &self,
        document_id: i64,
        tag_ids: &[i64],
        title: Option<&str>,
        correspondent: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history_documents (document_id, tags, title, correspondent)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(document_id)
        .bind(Json(tag_ids.to_vec()))
        .bind(title)
        .bind(correspondent)
        .execute(&self.pool)
        .await
        .map_err(Error::Ledger)?;
        Ok(())
    }

    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, tags, title, correspondent, created_at
            FROM history_documents
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Ledger)?;

        Ok(rows.into_iter().map(map_row).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history_documents")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(count)
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        if document_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM history_documents WHERE document_id = ANY($1)")
            .bind(document_ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history_documents")
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }
}
