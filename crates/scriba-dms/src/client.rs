//! HTTP client for the external document-management store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use scriba_core::defaults::STORE_PAGE_SIZE;
use scriba_core::{
    Correspondent, DmsConfig, Document, DocumentStore, DocumentType, DocumentUpdate, Error,
    Result, Tag,
};

use crate::types::{CreateNamed, DocumentDetail, NamedEntity, Page, UiSettings};

/// Timeout for individual store requests (seconds). Listing and metadata
/// calls are cheap; long-running work happens at the AI provider, not here.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Typed reqwest client for the document store API.
///
/// Authentication uses the store's token scheme on every request. All
/// methods surface transport and status failures as [`Error::Store`];
/// callers decide whether that is document-local or scan-fatal.
pub struct DmsClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl DmsClient {
    /// Create a new client from connection settings.
    pub fn new(config: DmsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Store(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
            .map_err(|e| Error::Store(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "GET {} returned {}: {}",
                url, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Store(format!("GET {} returned malformed JSON: {}", url, e)))
    }

    /// Walk a paginated listing, following `next` links until exhausted.
    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut url = Some(first_url);
        while let Some(current) = url {
            let page: Page<T> = self.get_json(&current).await?;
            results.extend(page.results);
            url = page.next;
        }
        Ok(results)
    }

    async fn create_named(&self, path: &str, name: &str) -> Result<NamedEntity> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&CreateNamed { name })
            .send()
            .await
            .map_err(|e| Error::Store(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "POST {} returned {}: {}",
                url, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Store(format!("POST {} returned malformed JSON: {}", url, e)))
    }

    async fn get_detail(&self, id: i64) -> Result<DocumentDetail> {
        let url = self.url(&format!("/api/documents/{}/", id));
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
            .map_err(|e| Error::Store(format!("GET {} failed: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::DocumentNotFound(id));
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "GET {} returned {}: {}",
                url, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Store(format!("GET {} returned malformed JSON: {}", url, e)))
    }
}

#[async_trait]
impl DocumentStore for DmsClient {
    #[instrument(skip(self), fields(subsystem = "dms", op = "list_documents"))]
    async fn list_documents(&self) -> Result<Vec<Document>> {
        let first = self.url(&format!("/api/documents/?page_size={}", STORE_PAGE_SIZE));
        let details: Vec<DocumentDetail> = self.get_all_pages(first).await?;
        debug!(doc_count = details.len(), "Fetched document listing");
        Ok(details.into_iter().map(Document::from).collect())
    }

    async fn get_document(&self, id: i64) -> Result<Document> {
        Ok(self.get_detail(id).await?.into())
    }

    async fn get_content(&self, id: i64) -> Result<String> {
        Ok(self.get_detail(id).await?.content.unwrap_or_default())
    }

    async fn get_owner_of(&self, id: i64) -> Result<Option<i64>> {
        Ok(self.get_detail(id).await?.owner)
    }

    async fn current_user_id(&self) -> Result<i64> {
        let settings: UiSettings = self.get_json(&self.url("/api/ui_settings/")).await?;
        Ok(settings.user.id)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let first = self.url(&format!("/api/tags/?page_size={}", STORE_PAGE_SIZE));
        let entities: Vec<NamedEntity> = self.get_all_pages(first).await?;
        Ok(entities.into_iter().map(Tag::from).collect())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        Ok(self.create_named("/api/tags/", name).await?.into())
    }

    async fn list_correspondents(&self) -> Result<Vec<Correspondent>> {
        let first = self.url(&format!("/api/correspondents/?page_size={}", STORE_PAGE_SIZE));
        let entities: Vec<NamedEntity> = self.get_all_pages(first).await?;
        Ok(entities.into_iter().map(Correspondent::from).collect())
    }

    async fn create_correspondent(&self, name: &str) -> Result<Correspondent> {
        Ok(self.create_named("/api/correspondents/", name).await?.into())
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>> {
        let first = self.url(&format!("/api/document_types/?page_size={}", STORE_PAGE_SIZE));
        let entities: Vec<NamedEntity> = self.get_all_pages(first).await?;
        Ok(entities.into_iter().map(DocumentType::from).collect())
    }

    async fn create_document_type(&self, name: &str) -> Result<DocumentType> {
        Ok(self.create_named("/api/document_types/", name).await?.into())
    }

    #[instrument(skip(self, update), fields(subsystem = "dms", op = "update_document", document_id = id))]
    async fn update_document(&self, id: i64, update: &DocumentUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("No fields to update, skipping PATCH");
            return Ok(());
        }

        let url = self.url(&format!("/api/documents/{}/", id));
        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(update)
            .send()
            .await
            .map_err(|e| Error::Store(format!("PATCH {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "PATCH {} returned {}: {}",
                url, status, body
            )));
        }
        Ok(())
    }
}
