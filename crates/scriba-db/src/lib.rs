//! # scriba-db
//!
//! PostgreSQL ledger layer for scriba.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for the ledger entities (processed records,
//!   original snapshots, annotation history, usage metrics)
//! - Embedded migrations (behind the `migrations` feature)
//!
//! The ledger is scriba's own bookkeeping, distinct from the external
//! document store: it records which documents have been annotated, what
//! their metadata looked like beforehand, and what each annotation cost.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scriba_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/scriba").await?;
//!     db.processed.upsert(42, Some("Invoice March")).await?;
//!     assert!(db.processed.is_processed(42).await?);
//!     Ok(())
//! }
//! ```

pub mod history;
pub mod metrics;
pub mod pool;
pub mod processed;
pub mod snapshots;

// Re-export core types
pub use scriba_core::*;

pub use history::PgHistoryRepository;
pub use metrics::PgMetricsRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use processed::PgProcessedRepository;
pub use snapshots::PgSnapshotRepository;

use std::sync::Arc;

/// Aggregate handle over every ledger repository, sharing one pool.
#[derive(Clone)]
pub struct Database {
    pub processed: PgProcessedRepository,
    pub snapshots: PgSnapshotRepository,
    pub history: PgHistoryRepository,
    pub metrics: PgMetricsRepository,
    pool: sqlx::PgPool,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            processed: PgProcessedRepository::new(pool.clone()),
            snapshots: PgSnapshotRepository::new(pool.clone()),
            history: PgHistoryRepository::new(pool.clone()),
            metrics: PgMetricsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Ledger(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Cheap connectivity probe for health checks.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Ledger)?;
        Ok(())
    }

    /// Trait-object bundle of the ledger repositories for the pipeline.
    pub fn ledger_handles(&self) -> LedgerHandles {
        LedgerHandles {
            processed: Arc::new(self.processed.clone()),
            snapshots: Arc::new(self.snapshots.clone()),
            history: Arc::new(self.history.clone()),
            metrics: Arc::new(self.metrics.clone()),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight connections to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
