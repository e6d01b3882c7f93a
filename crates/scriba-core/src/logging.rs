//! Structured logging schema and field name constants for scriba.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), scan completions |
//! | DEBUG | Decision points, skips, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "scan", "ledger", "inference", "dms"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "reconciler", "scheduler", "ollama", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "scan", "analyze", "update_document", "upsert"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document identifier being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Active AI provider name.
pub const PROVIDER: &str = "provider";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of documents seen by a scan.
pub const DOC_COUNT: &str = "doc_count";

/// Character length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Character length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

/// Token counts reported by a provider.
pub const TOTAL_TOKENS: &str = "total_tokens";
