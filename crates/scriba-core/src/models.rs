//! Core data models for scriba.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// DOCUMENT STORE ENTITIES
// =============================================================================

/// A document as held by the external document store.
///
/// The store owns the document lifecycle; scriba only reads documents and
/// writes partial metadata updates. Text content is fetched separately via
/// [`crate::DocumentStore::get_content`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Creation date as reported by the store (ISO `YYYY-MM-DD` or full
    /// timestamp, passed through opaquely).
    #[serde(default)]
    pub created: Option<String>,
    /// Owning user id. `None` means the store reports no owner restriction.
    #[serde(default)]
    pub owner: Option<i64>,
    /// Current tag id set.
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub correspondent: Option<i64>,
    #[serde(default)]
    pub document_type: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
}

/// A tag in the document store's taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A correspondent in the document store's taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correspondent {
    pub id: i64,
    pub name: String,
}

/// A document type in the document store's taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
}

/// Partial update issued against the document store.
///
/// Only populated fields are serialized, so a single PATCH carries exactly
/// the fields the pipeline decided to change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correspondent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DocumentUpdate {
    /// Returns true when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tags.is_none()
            && self.correspondent.is_none()
            && self.document_type.is_none()
            && self.created.is_none()
            && self.language.is_none()
    }
}

// =============================================================================
// ANALYSIS CONTRACT
// =============================================================================

/// Input to an AI provider analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document_id: i64,
    /// Document text, already capped by the pipeline; adapters may truncate
    /// further to fit their context budget.
    pub content: String,
    /// Names of tags that already exist in the store.
    pub existing_tags: Vec<String>,
    /// Names of correspondents that already exist in the store.
    pub existing_correspondents: Vec<String>,
}

/// Metadata suggested by the model for one document.
///
/// Every field defaults rather than failing: the sanitizer fills in what it
/// can recover from the model output and leaves the rest empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSuggestion {
    pub title: Option<String>,
    pub correspondent: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub document_type: Option<String>,
    /// ISO `YYYY-MM-DD` date string.
    pub document_date: Option<String>,
    /// Two-letter language code.
    pub language: Option<String>,
}

/// Token accounting reported by a provider. Zeroed when the provider does
/// not report usage, so the metrics schema stays uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Normalized result of one provider analysis call.
///
/// Adapters never return a transport-level error from `analyze`; faults are
/// carried in `error` so the pipeline treats them as a single-document
/// failure rather than a scan-level fault.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub suggestion: MetadataSuggestion,
    pub usage: TokenUsage,
    /// True when the adapter truncated content to fit its context budget.
    pub truncated: bool,
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Build a failure result with empty defaults.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when the call failed and the suggestion must not be applied.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// =============================================================================
// PIPELINE OUTCOME
// =============================================================================

/// Why a document was skipped without analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A processed record already exists for this document.
    AlreadyProcessed,
    /// The document belongs to a different user.
    NotOwned,
    /// The document has no usable text content.
    EmptyContent,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyProcessed => write!(f, "already processed"),
            Self::NotOwned => write!(f, "not owned by current user"),
            Self::EmptyContent => write!(f, "empty content"),
        }
    }
}

/// Summary of the annotation applied to one document.
#[derive(Debug, Clone, Default)]
pub struct AppliedAnnotation {
    pub document_id: i64,
    pub title: Option<String>,
    pub tag_ids: Vec<i64>,
    pub correspondent: Option<String>,
}

/// Terminal outcome of processing one document. Stage failures surface as
/// `Err` from the pipeline instead.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Skipped(SkipReason),
    Completed(AppliedAnnotation),
}

// =============================================================================
// LEDGER ROWS
// =============================================================================

/// Idempotency record: one per annotated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub document_id: i64,
    /// Title assigned by the most recent annotation.
    pub title: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Pre-annotation snapshot kept for reset/undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalSnapshot {
    pub document_id: i64,
    pub title: Option<String>,
    pub tags: Vec<i64>,
    pub correspondent: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row: one per successful annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub document_id: i64,
    /// Tag ids applied by the annotation.
    pub tags: Vec<i64>,
    pub title: Option<String>,
    /// Correspondent name suggested by the model.
    pub correspondent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Provider token accounting for one annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetric {
    pub document_id: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_update_empty() {
        let update = DocumentUpdate::default();
        assert!(update.is_empty());

        let update = DocumentUpdate {
            language: Some("en".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_document_update_skips_unset_fields() {
        let update = DocumentUpdate {
            title: Some("Invoice March".to_string()),
            tags: Some(vec![1, 2]),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("tags"));
        assert!(!obj.contains_key("correspondent"));
    }

    #[test]
    fn test_document_deserializes_with_missing_optionals() {
        let doc: Document = serde_json::from_str(r#"{"id": 7, "title": "x"}"#).unwrap();
        assert_eq!(doc.id, 7);
        assert!(doc.owner.is_none());
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_analysis_result_failure() {
        let result = AnalysisResult::failure("timed out");
        assert!(result.is_error());
        assert!(result.suggestion.tags.is_empty());
        assert_eq!(result.usage, TokenUsage::default());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::AlreadyProcessed.to_string(), "already processed");
        assert_eq!(SkipReason::EmptyContent.to_string(), "empty content");
    }
}
