//! Document store API request and response types.

use serde::{Deserialize, Serialize};

use scriba_core::{Correspondent, Document, DocumentType, Tag};

/// One page of a paginated listing endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[allow(dead_code)]
    pub count: i64,
    /// Absolute URL of the next page, if any.
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// Full document record as returned by the store, including raw text.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDetail {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub owner: Option<i64>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub correspondent: Option<i64>,
    #[serde(default)]
    pub document_type: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
}

impl From<DocumentDetail> for Document {
    fn from(detail: DocumentDetail) -> Self {
        Document {
            id: detail.id,
            title: detail.title,
            created: detail.created,
            owner: detail.owner,
            tags: detail.tags,
            correspondent: detail.correspondent,
            document_type: detail.document_type,
            language: detail.language,
        }
    }
}

/// Body for taxonomy creation endpoints.
#[derive(Debug, Serialize)]
pub struct CreateNamed<'a> {
    pub name: &'a str,
}

/// Named taxonomy entity as returned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

impl From<NamedEntity> for Tag {
    fn from(e: NamedEntity) -> Self {
        Tag { id: e.id, name: e.name }
    }
}

impl From<NamedEntity> for Correspondent {
    fn from(e: NamedEntity) -> Self {
        Correspondent { id: e.id, name: e.name }
    }
}

impl From<NamedEntity> for DocumentType {
    fn from(e: NamedEntity) -> Self {
        DocumentType { id: e.id, name: e.name }
    }
}

/// Response from the UI settings endpoint; carries the authenticated user.
#[derive(Debug, Deserialize)]
pub struct UiSettings {
    pub user: UiUser,
}

#[derive(Debug, Deserialize)]
pub struct UiUser {
    pub id: i64,
}
