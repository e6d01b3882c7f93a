//! Original-snapshot repository implementation.
//!
//! Snapshots capture a document's title, tag set, and correspondent as they
//! were before the annotation update, so an external reset can restore the
//! previous state. Rows are never auto-expired.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use scriba_core::{Error, OriginalSnapshot, Result, SnapshotRepository};

/// PostgreSQL implementation of [`SnapshotRepository`].
#[derive(Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn save(
        &self,
        document_id: i64,
        title: Option<&str>,
        tags: &[i64],
        correspondent: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO original_documents (document_id, title, tags, correspondent)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(document_id)
        .bind(title)
        .bind(Json(tags.to_vec()))
        .bind(correspondent)
        .execute(&self.pool)
        .await
        .map_err(Error::Ledger)?;
        Ok(())
    }

    async fn get(&self, document_id: i64) -> Result<Option<OriginalSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT document_id, title, tags, correspondent, created_at
            FROM original_documents
            WHERE document_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Ledger)?;

        Ok(row.map(|row| OriginalSnapshot {
            document_id: row.get("document_id"),
            title: row.get("title"),
            tags: row.get::<Json<Vec<i64>>, _>("tags").0,
            correspondent: row.get("correspondent"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        if document_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM original_documents WHERE document_id = ANY($1)")
            .bind(document_ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM original_documents")
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(result.rows_affected())
    }
}
