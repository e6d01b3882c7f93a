//! In-memory fakes for pipeline and scanner tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use scriba_core::{
    Correspondent, Document, DocumentStore, DocumentType, DocumentUpdate, Error, HistoryEntry,
    HistoryRepository, LedgerHandles, MetricsRepository, OriginalSnapshot, ProcessedDocument,
    ProcessedRepository, Result, SnapshotRepository, Tag, TokenUsage, UsageMetric,
};

// =============================================================================
// DOCUMENT STORE FAKE
// =============================================================================

/// Configurable in-memory document store.
#[derive(Default)]
pub struct FakeStore {
    pub documents: Mutex<Vec<Document>>,
    pub contents: Mutex<HashMap<i64, String>>,
    pub owners: Mutex<HashMap<i64, i64>>,
    pub user_id: i64,
    pub tags: Mutex<Vec<Tag>>,
    pub correspondents: Mutex<Vec<Correspondent>>,
    pub document_types: Mutex<Vec<DocumentType>>,
    /// `(document_id, serialized update)` per accepted PATCH.
    pub updates: Mutex<Vec<(i64, serde_json::Value)>>,
    pub fail_update: AtomicBool,
    pub fail_bulk: AtomicBool,
    /// Artificial latency for `list_documents`, for single-flight tests.
    pub list_delay_ms: AtomicU64,
    next_id: AtomicI64,
}

impl FakeStore {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    pub fn add_document(&self, id: i64, title: &str, content: &str) {
        self.documents.lock().unwrap().push(Document {
            id,
            title: title.to_string(),
            created: Some("2024-01-01".to_string()),
            owner: None,
            tags: vec![],
            correspondent: None,
            document_type: None,
            language: None,
        });
        self.contents.lock().unwrap().insert(id, content.to_string());
    }

    pub fn set_owner(&self, document_id: i64, owner: i64) {
        self.owners.lock().unwrap().insert(document_id, owner);
    }

    pub fn add_tag(&self, id: i64, name: &str) {
        self.tags.lock().unwrap().push(Tag {
            id,
            name: name.to_string(),
        });
    }

    pub fn updates(&self) -> Vec<(i64, serde_json::Value)> {
        self.updates.lock().unwrap().clone()
    }

    fn fresh_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        if self.fail_bulk.load(Ordering::SeqCst) {
            return Err(Error::Store("listing unavailable".to_string()));
        }
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn get_document(&self, id: i64) -> Result<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(Error::DocumentNotFound(id))
    }

    async fn get_content(&self, id: i64) -> Result<String> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_owner_of(&self, id: i64) -> Result<Option<i64>> {
        Ok(self.owners.lock().unwrap().get(&id).copied())
    }

    async fn current_user_id(&self) -> Result<i64> {
        Ok(self.user_id)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        if self.fail_bulk.load(Ordering::SeqCst) {
            return Err(Error::Store("listing unavailable".to_string()));
        }
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let tag = Tag {
            id: self.fresh_id(),
            name: name.to_string(),
        };
        self.tags.lock().unwrap().push(tag.clone());
        Ok(tag)
    }

    async fn list_correspondents(&self) -> Result<Vec<Correspondent>> {
        Ok(self.correspondents.lock().unwrap().clone())
    }

    async fn create_correspondent(&self, name: &str) -> Result<Correspondent> {
        let correspondent = Correspondent {
            id: self.fresh_id(),
            name: name.to_string(),
        };
        self.correspondents.lock().unwrap().push(correspondent.clone());
        Ok(correspondent)
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>> {
        Ok(self.document_types.lock().unwrap().clone())
    }

    async fn create_document_type(&self, name: &str) -> Result<DocumentType> {
        let doc_type = DocumentType {
            id: self.fresh_id(),
            name: name.to_string(),
        };
        self.document_types.lock().unwrap().push(doc_type.clone());
        Ok(doc_type)
    }

    async fn update_document(&self, id: i64, update: &DocumentUpdate) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::Store("update rejected".to_string()));
        }
        self.updates
            .lock()
            .unwrap()
            .push((id, serde_json::to_value(update)?));
        Ok(())
    }
}

// =============================================================================
// LEDGER FAKE
// =============================================================================

/// In-memory ledger implementing every repository trait.
#[derive(Default)]
pub struct InMemoryLedger {
    pub processed: Mutex<HashMap<i64, ProcessedDocument>>,
    pub snapshots: Mutex<Vec<OriginalSnapshot>>,
    pub history: Mutex<Vec<HistoryEntry>>,
    pub metrics: Mutex<Vec<UsageMetric>>,
    pub fail_reads: AtomicBool,
    history_id: AtomicI64,
}

impl InMemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Bundle one in-memory ledger behind every repository handle.
pub fn ledger_handles(ledger: &Arc<InMemoryLedger>) -> LedgerHandles {
    LedgerHandles {
        processed: ledger.clone(),
        snapshots: ledger.clone(),
        history: ledger.clone(),
        metrics: ledger.clone(),
    }
}

#[async_trait]
impl ProcessedRepository for InMemoryLedger {
    async fn is_processed(&self, document_id: i64) -> Result<bool> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("ledger unavailable".to_string()));
        }
        Ok(self.processed.lock().unwrap().contains_key(&document_id))
    }

    async fn upsert(&self, document_id: i64, title: Option<&str>) -> Result<()> {
        let mut processed = self.processed.lock().unwrap();
        let now = Utc::now();
        processed
            .entry(document_id)
            .and_modify(|record| {
                record.title = title.map(str::to_string);
                record.last_updated = now;
            })
            .or_insert(ProcessedDocument {
                document_id,
                title: title.map(str::to_string),
                processed_at: now,
                last_updated: now,
            });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessedDocument>> {
        Ok(self.processed.lock().unwrap().values().cloned().collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.processed.lock().unwrap().len() as i64)
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        let mut processed = self.processed.lock().unwrap();
        let before = processed.len();
        for id in document_ids {
            processed.remove(id);
        }
        Ok((before - processed.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut processed = self.processed.lock().unwrap();
        let removed = processed.len() as u64;
        processed.clear();
        Ok(removed)
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryLedger {
    async fn save(
        &self,
        document_id: i64,
        title: Option<&str>,
        tags: &[i64],
        correspondent: Option<i64>,
    ) -> Result<()> {
        self.snapshots.lock().unwrap().push(OriginalSnapshot {
            document_id,
            title: title.map(str::to_string),
            tags: tags.to_vec(),
            correspondent,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get(&self, document_id: i64) -> Result<Option<OriginalSnapshot>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.document_id == document_id)
            .cloned())
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let before = snapshots.len();
        snapshots.retain(|s| !document_ids.contains(&s.document_id));
        Ok((before - snapshots.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let removed = snapshots.len() as u64;
        snapshots.clear();
        Ok(removed)
    }
}

#[async_trait]
impl HistoryRepository for InMemoryLedger {
    async fn append(
        &self,
        document_id: i64,
        tag_ids: &[i64],
        title: Option<&str>,
        correspondent: Option<&str>,
    ) -> Result<()> {
        self.history.lock().unwrap().push(HistoryEntry {
            id: self.history_id.fetch_add(1, Ordering::SeqCst),
            document_id,
            tags: tag_ids.to_vec(),
            title: title.map(str::to_string),
            correspondent: correspondent.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<HistoryEntry>> {
        let history = self.history.lock().unwrap();
        Ok(history
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.history.lock().unwrap().len() as i64)
    }

    async fn delete_by_ids(&self, document_ids: &[i64]) -> Result<u64> {
        let mut history = self.history.lock().unwrap();
        let before = history.len();
        history.retain(|e| !document_ids.contains(&e.document_id));
        Ok((before - history.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut history = self.history.lock().unwrap();
        let removed = history.len() as u64;
        history.clear();
        Ok(removed)
    }
}

#[async_trait]
impl MetricsRepository for InMemoryLedger {
    async fn record(&self, document_id: i64, usage: TokenUsage) -> Result<()> {
        self.metrics.lock().unwrap().push(UsageMetric {
            document_id,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UsageMetric>> {
        Ok(self.metrics.lock().unwrap().clone())
    }
}
