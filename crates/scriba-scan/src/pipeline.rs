//! Per-document processing pipeline.
//!
//! Each document moves through a fixed stage order: idempotency check →
//! ownership check → content fetch → AI analysis → taxonomy reconciliation
//! → store update → ledger recording. Skips (already processed, not owned,
//! empty content) are expected outcomes, not errors; any stage failure is a
//! document-local failure surfaced as `Err` so the scan can log it and
//! continue with the next document.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use scriba_core::defaults::{CONTENT_MAX_CHARS, CONTENT_MIN_CHARS};
use scriba_core::{
    AnalysisBackend, AnalysisRequest, AppliedAnnotation, Document, DocumentStore, DocumentUpdate,
    Error, FieldToggles, LedgerHandles, ProcessOutcome, Result, SkipReason,
};

use crate::reconcile::{merge_tag_ids, TaxonomyReconciler};

/// Drives one document through annotation.
pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
    backend: Arc<dyn AnalysisBackend>,
    ledger: LedgerHandles,
    toggles: FieldToggles,
}

impl DocumentPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backend: Arc<dyn AnalysisBackend>,
        ledger: LedgerHandles,
        toggles: FieldToggles,
    ) -> Self {
        Self {
            store,
            backend,
            ledger,
            toggles,
        }
    }

    /// Process one document end to end.
    ///
    /// `own_user_id` is the store user this service authenticates as;
    /// `reconciler` carries the scan-wide taxonomy cache.
    #[instrument(skip_all, fields(subsystem = "scan", component = "pipeline", document_id = document.id))]
    pub async fn process(
        &self,
        document: &Document,
        own_user_id: i64,
        reconciler: &mut TaxonomyReconciler,
    ) -> Result<ProcessOutcome> {
        // Idempotency: presence of a processed record is the sole signal.
        // A ledger read failure counts as processed; a document is never
        // re-annotated because the ledger was unreachable.
        match self.ledger.processed.is_processed(document.id).await {
            Ok(true) => {
                debug!("Already processed, skipping");
                return Ok(ProcessOutcome::Skipped(SkipReason::AlreadyProcessed));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Ledger check failed, treating document as processed");
                return Ok(ProcessOutcome::Skipped(SkipReason::AlreadyProcessed));
            }
        }

        // Ownership: a different owner is an expected skip in multi-user
        // stores. No owner at all means no restriction and proceeds.
        let owner = self.store.get_owner_of(document.id).await?;
        if let Some(owner_id) = owner {
            if owner_id != own_user_id {
                debug!(owner_id, "Owned by another user, skipping");
                return Ok(ProcessOutcome::Skipped(SkipReason::NotOwned));
            }
        }

        // Content and current metadata are independent reads.
        let (content, current) = tokio::join!(
            self.store.get_content(document.id),
            self.store.get_document(document.id)
        );
        let content = content?;
        let current = current?;

        if content.chars().count() < CONTENT_MIN_CHARS {
            debug!("No usable content, skipping");
            return Ok(ProcessOutcome::Skipped(SkipReason::EmptyContent));
        }
        let content = cap_content(document.id, content);

        let analysis = self
            .backend
            .analyze(&AnalysisRequest {
                document_id: document.id,
                content,
                existing_tags: reconciler.tag_names().to_vec(),
                existing_correspondents: reconciler.correspondent_names().to_vec(),
            })
            .await;
        if let Some(message) = analysis.error {
            return Err(Error::Provider(message));
        }
        let suggestion = analysis.suggestion;

        // Assemble the update, honoring per-field toggles. Date and
        // language are core fields and bypass the toggles.
        let mut update = DocumentUpdate::default();
        let mut applied_tag_ids = Vec::new();

        if self.toggles.tagging {
            let (resolved, failed) = reconciler.resolve_tags(&suggestion.tags).await;
            if !failed.is_empty() {
                warn!(failed = ?failed, "Some suggested tags could not be resolved");
            }
            applied_tag_ids = merge_tag_ids(&current.tags, &resolved);
            update.tags = Some(applied_tag_ids.clone());
        }

        if self.toggles.titles {
            update.title = suggestion
                .title
                .clone()
                .or_else(|| Some(current.title.clone()));
        }

        if self.toggles.document_types {
            if let Some(ref name) = suggestion.document_type {
                update.document_type = reconciler.resolve_document_type(name).await;
            }
        }

        if self.toggles.correspondents {
            if let Some(ref name) = suggestion.correspondent {
                update.correspondent = reconciler.resolve_correspondent(name).await;
            }
        }

        update.created = suggestion.document_date.clone().or_else(|| current.created.clone());
        update.language = suggestion.language.clone();

        // The store update must succeed before anything is recorded; a
        // rejected update leaves no ledger trace, so the document stays
        // eligible for the next scan.
        self.store.update_document(document.id, &update).await?;

        // Recording is concurrent and best-effort: the update is durable
        // once the store accepted it, so failures here are logged only.
        let snapshot_title = (!current.title.is_empty()).then_some(current.title.as_str());
        let (snapshot, processed, metric, history) = tokio::join!(
            self.ledger.snapshots.save(
                document.id,
                snapshot_title,
                &current.tags,
                current.correspondent
            ),
            self.ledger
                .processed
                .upsert(document.id, update.title.as_deref()),
            self.ledger.metrics.record(document.id, analysis.usage),
            self.ledger.history.append(
                document.id,
                &applied_tag_ids,
                update.title.as_deref(),
                suggestion.correspondent.as_deref()
            ),
        );
        for (op, result) in [
            ("save_snapshot", snapshot),
            ("upsert_processed", processed),
            ("record_metric", metric),
            ("append_history", history),
        ] {
            if let Err(e) = result {
                warn!(op, error = %e, "Ledger write failed after store update");
            }
        }

        debug!(
            tag_count = applied_tag_ids.len(),
            truncated = analysis.truncated,
            "Document annotated"
        );
        Ok(ProcessOutcome::Completed(AppliedAnnotation {
            document_id: document.id,
            title: update.title,
            tag_ids: applied_tag_ids,
            correspondent: suggestion.correspondent,
        }))
    }
}

/// Prefix-truncate content to the hard cap.
fn cap_content(document_id: i64, content: String) -> String {
    if content.chars().count() <= CONTENT_MAX_CHARS {
        return content;
    }
    warn!(
        document_id,
        content_len = content.chars().count(),
        "Content exceeds cap, truncating"
    );
    content.chars().take(CONTENT_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_content_bound() {
        let content = "a".repeat(80_000);
        let capped = cap_content(1, content.clone());
        assert_eq!(capped.chars().count(), CONTENT_MAX_CHARS);
        assert_eq!(capped, content[..CONTENT_MAX_CHARS]);

        let short = "short".to_string();
        assert_eq!(cap_content(1, short.clone()), short);
    }
}
