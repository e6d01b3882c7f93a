//! # scriba-dms
//!
//! Typed HTTP client for the external document-management store.
//!
//! Implements [`scriba_core::DocumentStore`] against the store's REST API:
//! document listing and retrieval, raw text content, taxonomy listing and
//! creation (tags, correspondents, document types), ownership resolution,
//! and partial document updates.

pub mod client;
pub mod types;

pub use client::DmsClient;
