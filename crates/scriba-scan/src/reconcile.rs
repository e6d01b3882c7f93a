//! Taxonomy reconciliation: map model-suggested names onto existing store
//! entities, creating new ones only when no case-insensitive match exists.
//!
//! One reconciler lives for the duration of a scan. Tags and correspondents
//! are preloaded by the scan's bulk fetch; document types are loaded on
//! first use. Entities created during the scan enter the cache, so the same
//! new name suggested by two documents resolves to one entity. Documents are
//! processed sequentially within a scan, which is what makes the
//! create-if-absent path safe without per-name locking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use scriba_core::{Correspondent, DocumentStore, DocumentType, Tag};

/// Per-scan name resolver for tags, correspondents, and document types.
pub struct TaxonomyReconciler {
    store: Arc<dyn DocumentStore>,
    tags: HashMap<String, Tag>,
    tag_names: Vec<String>,
    correspondents: HashMap<String, Correspondent>,
    correspondent_names: Vec<String>,
    document_types: Option<HashMap<String, DocumentType>>,
}

fn cache_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl TaxonomyReconciler {
    /// Build a reconciler from the scan's preloaded listings.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        tags: Vec<Tag>,
        correspondents: Vec<Correspondent>,
    ) -> Self {
        let tag_names = tags.iter().map(|t| t.name.clone()).collect();
        let correspondent_names = correspondents.iter().map(|c| c.name.clone()).collect();
        Self {
            store,
            tags: tags.into_iter().map(|t| (cache_key(&t.name), t)).collect(),
            tag_names,
            correspondents: correspondents
                .into_iter()
                .map(|c| (cache_key(&c.name), c))
                .collect(),
            correspondent_names,
            document_types: None,
        }
    }

    /// Tag names as preloaded at scan start, for prompt construction.
    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    /// Correspondent names as preloaded at scan start, for prompt
    /// construction.
    pub fn correspondent_names(&self) -> &[String] {
        &self.correspondent_names
    }

    /// Resolve suggested tag names to ids, creating missing tags.
    ///
    /// Returns the resolved ids (deduplicated, in suggestion order) and the
    /// names that could not be resolved. A creation failure drops only that
    /// tag; the suggestion count is accepted as given and never re-limited.
    pub async fn resolve_tags(&mut self, names: &[String]) -> (Vec<i64>, Vec<String>) {
        let mut resolved = Vec::new();
        let mut failed = Vec::new();

        for name in names {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = cache_key(trimmed);
            let id = match self.tags.get(&key) {
                Some(tag) => tag.id,
                None => match self.store.create_tag(trimmed).await {
                    Ok(tag) => {
                        debug!(tag = %tag.name, id = tag.id, "Created new tag");
                        let id = tag.id;
                        self.tags.insert(key, tag);
                        id
                    }
                    Err(e) => {
                        warn!(tag = trimmed, error = %e, "Failed to create tag, omitting");
                        failed.push(trimmed.to_string());
                        continue;
                    }
                },
            };
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }

        (resolved, failed)
    }

    /// Resolve a correspondent name to an id, creating it when missing.
    /// Returns `None` (and logs) when creation fails.
    pub async fn resolve_correspondent(&mut self, name: &str) -> Option<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        let key = cache_key(trimmed);
        if let Some(existing) = self.correspondents.get(&key) {
            return Some(existing.id);
        }
        match self.store.create_correspondent(trimmed).await {
            Ok(correspondent) => {
                debug!(correspondent = %correspondent.name, id = correspondent.id, "Created new correspondent");
                let id = correspondent.id;
                self.correspondents.insert(key, correspondent);
                Some(id)
            }
            Err(e) => {
                warn!(correspondent = trimmed, error = %e, "Failed to create correspondent, omitting");
                None
            }
        }
    }

    /// Resolve a document type name to an id, creating it when missing.
    /// The store's type listing is fetched on first use and cached for the
    /// scan. Returns `None` (and logs) on failure.
    pub async fn resolve_document_type(&mut self, name: &str) -> Option<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.document_types.is_none() {
            match self.store.list_document_types().await {
                Ok(types) => {
                    self.document_types = Some(
                        types
                            .into_iter()
                            .map(|t| (cache_key(&t.name), t))
                            .collect(),
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to list document types, omitting");
                    return None;
                }
            }
        }
        let types = self.document_types.as_mut().expect("loaded above");

        let key = cache_key(trimmed);
        if let Some(existing) = types.get(&key) {
            return Some(existing.id);
        }
        match self.store.create_document_type(trimmed).await {
            Ok(doc_type) => {
                debug!(document_type = %doc_type.name, id = doc_type.id, "Created new document type");
                let id = doc_type.id;
                types.insert(key, doc_type);
                Some(id)
            }
            Err(e) => {
                warn!(document_type = trimmed, error = %e, "Failed to create document type, omitting");
                None
            }
        }
    }
}

/// Compute the replacement tag set for a document: prior tags that are no
/// longer suggested are removed first, then newly resolved ids are added.
/// Remove-before-add avoids a transient state where both old and new tags
/// are present.
pub fn merge_tag_ids(prior: &[i64], resolved: &[i64]) -> Vec<i64> {
    let mut merged: Vec<i64> = prior
        .iter()
        .copied()
        .filter(|id| resolved.contains(id))
        .collect();
    for id in resolved {
        if !merged.contains(id) {
            merged.push(*id);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use scriba_core::{Document, DocumentUpdate, Error, Result};

    /// Store fake that records creations and can be told to fail them.
    #[derive(Default)]
    struct CreationStore {
        next_id: AtomicI64,
        created: Mutex<Vec<String>>,
        fail_creates: bool,
    }

    impl CreationStore {
        fn new() -> Self {
            Self {
                next_id: AtomicI64::new(100),
                ..Default::default()
            }
        }

        fn created(&self) -> Vec<String> {
            self.created.lock().unwrap().clone()
        }

        fn fresh_id(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for CreationStore {
        async fn list_documents(&self) -> Result<Vec<Document>> {
            Ok(vec![])
        }
        async fn get_document(&self, id: i64) -> Result<Document> {
            Err(Error::DocumentNotFound(id))
        }
        async fn get_content(&self, _id: i64) -> Result<String> {
            Ok(String::new())
        }
        async fn get_owner_of(&self, _id: i64) -> Result<Option<i64>> {
            Ok(None)
        }
        async fn current_user_id(&self) -> Result<i64> {
            Ok(1)
        }
        async fn list_tags(&self) -> Result<Vec<Tag>> {
            Ok(vec![])
        }
        async fn create_tag(&self, name: &str) -> Result<Tag> {
            if self.fail_creates {
                return Err(Error::Store("create failed".to_string()));
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(Tag {
                id: self.fresh_id(),
                name: name.to_string(),
            })
        }
        async fn list_correspondents(&self) -> Result<Vec<Correspondent>> {
            Ok(vec![])
        }
        async fn create_correspondent(&self, name: &str) -> Result<Correspondent> {
            if self.fail_creates {
                return Err(Error::Store("create failed".to_string()));
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(Correspondent {
                id: self.fresh_id(),
                name: name.to_string(),
            })
        }
        async fn list_document_types(&self) -> Result<Vec<DocumentType>> {
            Ok(vec![DocumentType {
                id: 9,
                name: "Invoice".to_string(),
            }])
        }
        async fn create_document_type(&self, name: &str) -> Result<DocumentType> {
            if self.fail_creates {
                return Err(Error::Store("create failed".to_string()));
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(DocumentType {
                id: self.fresh_id(),
                name: name.to_string(),
            })
        }
        async fn update_document(&self, _id: i64, _update: &DocumentUpdate) -> Result<()> {
            Ok(())
        }
    }

    fn reconciler_with(store: CreationStore, tags: Vec<Tag>) -> TaxonomyReconciler {
        TaxonomyReconciler::new(Arc::new(store), tags, vec![])
    }

    #[tokio::test]
    async fn test_case_insensitive_match_creates_nothing() {
        let store = Arc::new(CreationStore::new());
        let mut reconciler = TaxonomyReconciler::new(
            store.clone(),
            vec![Tag {
                id: 5,
                name: "Invoice".to_string(),
            }],
            vec![],
        );

        let (resolved, failed) = reconciler.resolve_tags(&["invoice".to_string()]).await;
        assert_eq!(resolved, vec![5]);
        assert!(failed.is_empty());
        assert!(store.created().is_empty(), "no duplicate tag may be created");
    }

    #[tokio::test]
    async fn test_unknown_tag_is_created_once_per_scan() {
        let store = Arc::new(CreationStore::new());
        let mut reconciler = TaxonomyReconciler::new(store.clone(), vec![], vec![]);

        let (first, _) = reconciler.resolve_tags(&["Receipts".to_string()]).await;
        let (second, _) = reconciler.resolve_tags(&["receipts".to_string()]).await;
        assert_eq!(first, second, "created tag must enter the cache");
        assert_eq!(store.created(), vec!["Receipts"]);
    }

    #[tokio::test]
    async fn test_creation_failure_omits_tag_only() {
        let store = CreationStore {
            fail_creates: true,
            ..CreationStore::new()
        };
        let mut reconciler = reconciler_with(
            store,
            vec![Tag {
                id: 1,
                name: "Known".to_string(),
            }],
        );

        let (resolved, failed) = reconciler
            .resolve_tags(&["Known".to_string(), "Unknown".to_string()])
            .await;
        assert_eq!(resolved, vec![1]);
        assert_eq!(failed, vec!["Unknown"]);
    }

    #[tokio::test]
    async fn test_duplicate_and_blank_suggestions_collapse() {
        let mut reconciler = reconciler_with(
            CreationStore::new(),
            vec![Tag {
                id: 3,
                name: "Tax".to_string(),
            }],
        );

        let (resolved, failed) = reconciler
            .resolve_tags(&[
                "Tax".to_string(),
                " tax ".to_string(),
                "".to_string(),
                "  ".to_string(),
            ])
            .await;
        assert_eq!(resolved, vec![3]);
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn test_correspondent_resolution_prefers_existing() {
        let store = Arc::new(CreationStore::new());
        let mut reconciler = TaxonomyReconciler::new(
            store.clone(),
            vec![],
            vec![Correspondent {
                id: 77,
                name: "ACME Corp".to_string(),
            }],
        );

        assert_eq!(reconciler.resolve_correspondent("acme corp").await, Some(77));
        assert!(store.created().is_empty());

        let created = reconciler.resolve_correspondent("New Sender").await;
        assert!(created.is_some());
        assert_eq!(store.created(), vec!["New Sender"]);
    }

    #[tokio::test]
    async fn test_document_types_load_lazily() {
        let mut reconciler = reconciler_with(CreationStore::new(), vec![]);
        assert_eq!(reconciler.resolve_document_type("invoice").await, Some(9));
    }

    #[test]
    fn test_merge_removes_before_adding() {
        // Prior {1, 2, 3}; suggestion resolves to {2, 4}: 1 and 3 are
        // removed, 4 is added, 2 survives.
        assert_eq!(merge_tag_ids(&[1, 2, 3], &[2, 4]), vec![2, 4]);
        assert_eq!(merge_tag_ids(&[], &[5, 6]), vec![5, 6]);
        assert_eq!(merge_tag_ids(&[7, 8], &[]), Vec::<i64>::new());
        assert_eq!(merge_tag_ids(&[1, 2], &[2, 1]), vec![1, 2]);
    }
}
