//! Core traits for scriba abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability: the HTTP document
//! store client lives in `scriba-dms`, the PostgreSQL ledger in `scriba-db`,
//! and the provider adapters in `scriba-inference`, while the pipeline in
//! `scriba-scan` only ever sees these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Typed access to the external document-management store.
///
/// All operations may fail with a transport error; callers decide whether
/// that is document-local (per-document operations) or scan-fatal (the bulk
/// listing calls at the start of a scan).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document in the store, following pagination.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Fetch one document's current metadata.
    async fn get_document(&self, id: i64) -> Result<Document>;

    /// Fetch one document's raw text content.
    async fn get_content(&self, id: i64) -> Result<String>;

    /// Resolve the owning user of a document. `None` means the store reports
    /// no owner restriction for it.
    async fn get_owner_of(&self, id: i64) -> Result<Option<i64>>;

    /// Resolve the id of the authenticated user this client acts as.
    async fn current_user_id(&self) -> Result<i64>;

    /// List every tag, following pagination.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Create a new tag and return it with its generated id.
    async fn create_tag(&self, name: &str) -> Result<Tag>;

    /// List every correspondent, following pagination.
    async fn list_correspondents(&self) -> Result<Vec<Correspondent>>;

    /// Create a new correspondent and return it with its generated id.
    async fn create_correspondent(&self, name: &str) -> Result<Correspondent>;

    /// List every document type, following pagination.
    async fn list_document_types(&self) -> Result<Vec<DocumentType>>;

    /// Create a new document type and return it with its generated id.
    async fn create_document_type(&self, name: &str) -> Result<DocumentType>;

    /// Apply a partial metadata update to a document.
    async fn update_document(&self, id: i64, update: &DocumentUpdate) -> Result<()>;
}

// =============================================================================
// AI PROVIDER
// =============================================================================

/// A pluggable AI completion backend.
///
/// `analyze` is infallible by signature: transport, authentication, and
/// response-shape faults are reported through [`AnalysisResult::error`] so
/// the pipeline can treat them as a single-document failure rather than a
/// scan-level fault.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Short provider name for logs ("openai", "ollama", "mock").
    fn provider_name(&self) -> &str;

    /// Analyze document content and return normalized metadata suggestions.
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult;
}

// =============================================================================
// LEDGER REPOSITORIES
// =============================================================================

/// Idempotency records: presence of a row is the sole signal that a document
/// has already been handled.
#[async_trait]
pub trait ProcessedRepository: Send + Sync {
    /// True iff a processed record exists for the document.
    async fn is_processed(&self, document_id: i64) -> Result<bool>;

    /// Insert a record, or refresh `last_updated` if one already exists.
    async fn upsert(&self, document_id: i64, title: Option<&str>) -> Result<()>;

    /// All processed records.
    async fn list(&self) -> Result<Vec<ProcessedDocument>>;

    /// Number of processed records.
    async fn count(&self) -> Result<i64>;

    /// Delete records for the given document ids; returns rows removed.
    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64>;

    /// Delete every record; returns rows removed.
    async fn delete_all(&self) -> Result<u64>;
}

/// Pre-annotation snapshots for reset/undo.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Record the document's state as it was before the update.
    async fn save(
        &self,
        document_id: i64,
        title: Option<&str>,
        tags: &[i64],
        correspondent: Option<i64>,
    ) -> Result<()>;

    /// Most recent snapshot for a document, if any.
    async fn get(&self, document_id: i64) -> Result<Option<OriginalSnapshot>>;

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;
}

/// Append-only annotation audit log.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append one row for a successful annotation.
    async fn append(
        &self,
        document_id: i64,
        tag_ids: &[i64],
        title: Option<&str>,
        correspondent: Option<&str>,
    ) -> Result<()>;

    /// Newest-first page of history rows.
    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<HistoryEntry>>;

    async fn count(&self) -> Result<i64>;

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;
}

/// Provider token accounting.
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    async fn record(&self, document_id: i64, usage: TokenUsage) -> Result<()>;

    async fn list(&self) -> Result<Vec<UsageMetric>>;
}

/// The ledger repositories the pipeline writes to, bundled for injection.
#[derive(Clone)]
pub struct LedgerHandles {
    pub processed: Arc<dyn ProcessedRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub metrics: Arc<dyn MetricsRepository>,
}
