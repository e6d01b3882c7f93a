//! # scriba-inference
//!
//! AI provider adapters for scriba.
//!
//! This crate provides:
//! - [`OllamaBackend`] and [`OpenAiBackend`] implementations of
//!   [`scriba_core::AnalysisBackend`]
//! - the shared prompt construction and context budgeting layer
//!   ([`prompt`]) used by every adapter
//! - the tolerant JSON extraction/repair layer ([`sanitize`]) for model
//!   output
//! - a deterministic [`MockBackend`] for tests
//!
//! Adapters never return transport errors from `analyze`; faults land in
//! [`scriba_core::AnalysisResult::error`] so the pipeline treats them as a
//! single-document failure.

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod sanitize;
pub mod select;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use select::build_backend;
