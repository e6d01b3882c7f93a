//! # scriba-core
//!
//! Core types, traits, and configuration for scriba, the document
//! synchronization and annotation service.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other scriba crates depend on: the document store
//! and ledger abstractions, the AI provider contract, typed configuration,
//! and shared constants. It performs no I/O itself.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{
    DmsConfig, FieldToggles, LedgerConfig, OllamaConfig, OpenAiConfig, PromptConfig,
    ProviderKind, ScanConfig, ScribaConfig,
};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
