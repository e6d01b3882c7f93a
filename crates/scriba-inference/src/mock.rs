//! Mock analysis backend for deterministic testing.
//!
//! Returns a fixed suggestion, counts calls, and records every request it
//! receives so tests can assert what the pipeline actually sent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scriba_core::{
    AnalysisBackend, AnalysisRequest, AnalysisResult, MetadataSuggestion, TokenUsage,
};

/// Mock analysis backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    suggestion: MetadataSuggestion,
    usage: TokenUsage,
    error: Option<String>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl MockBackend {
    /// Create a mock that returns empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the suggestion returned by every call.
    pub fn with_suggestion(mut self, suggestion: MetadataSuggestion) -> Self {
        self.suggestion = suggestion;
        self
    }

    /// Set the token usage returned by every call.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Make every call fail with the given error message.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Number of analyze calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received, in order.
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("mock lock").push(request.clone());

        match &self.error {
            Some(message) => AnalysisResult::failure(message.clone()),
            None => AnalysisResult {
                suggestion: self.suggestion.clone(),
                usage: self.usage,
                truncated: false,
                error: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            document_id: 1,
            content: "hello".to_string(),
            existing_tags: vec![],
            existing_correspondents: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockBackend::new();
        assert_eq!(mock.call_count(), 0);
        mock.analyze(&request()).await;
        mock.analyze(&request()).await;
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_error_result() {
        let mock = MockBackend::new().with_error("backend down");
        let result = mock.analyze(&request()).await;
        assert_eq!(result.error.as_deref(), Some("backend down"));
        assert!(result.suggestion.tags.is_empty());
    }
}
