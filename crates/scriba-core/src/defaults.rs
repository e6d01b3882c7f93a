//! Centralized default constants for scriba.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// CONTENT LIMITS
// =============================================================================

/// Hard cap on document content length (characters) before analysis.
/// Bounds provider request cost and latency; truncation is prefix-based.
pub const CONTENT_MAX_CHARS: usize = 50_000;

/// Minimum content length (characters) below which a document is skipped
/// as effectively empty.
pub const CONTENT_MIN_CHARS: usize = 10;

// =============================================================================
// TOKEN BUDGETING
// =============================================================================

/// Rough token estimate: characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Share of a truncated document kept from the beginning; the remainder is
/// kept from the end.
pub const TRUNCATE_PREFIX_SHARE: f64 = 0.4;

/// Default model context window (tokens) for OpenAI-compatible providers.
pub const OPENAI_MAX_CONTEXT_TOKENS: usize = 128_000;

/// Tokens reserved for the model response on OpenAI-compatible providers.
pub const OPENAI_RESPONSE_RESERVE_TOKENS: usize = 1_000;

/// Default maximum Ollama context window (tokens).
pub const OLLAMA_MAX_CTX: usize = 128_000;

/// Expected response length (tokens) used when sizing the Ollama context.
pub const OLLAMA_EXPECTED_RESPONSE_TOKENS: usize = 1_024;

// =============================================================================
// PROVIDERS
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Default Ollama generation model.
pub const OLLAMA_MODEL: &str = "llama3.2";

/// Timeout for Ollama generation requests (seconds). Local models on modest
/// hardware can legitimately take minutes per document.
pub const OLLAMA_TIMEOUT_SECS: u64 = 1_200;

/// Default OpenAI API endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default OpenAI generation model.
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Timeout for OpenAI-compatible requests (seconds).
pub const OPENAI_TIMEOUT_SECS: u64 = 300;

/// Default sampling temperature for OpenAI-compatible providers.
pub const OPENAI_TEMPERATURE: f32 = 0.3;

// =============================================================================
// SCANNING
// =============================================================================

/// Default scan schedule (standard five-field cron expression).
pub const SCAN_SCHEDULE: &str = "*/30 * * * *";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for ledger list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

/// Page size used when walking paginated document store listings.
pub const STORE_PAGE_SIZE: usize = 100;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind address.
pub const BIND_ADDR: &str = "0.0.0.0:3000";
