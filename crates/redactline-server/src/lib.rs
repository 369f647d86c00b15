//! Redactline server
//!
//! The calling layer around `redactline-pii`:
//! - Configuration from YAML/TOML files and environment variables
//! - Text extraction from uploaded documents
//! - A TTL-bounded document store for later download
//! - Export of redacted documents and audit trails
//! - The JSON HTTP API

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod logging;
pub mod routes;
pub mod store;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{AppState, router};
pub use store::{DocumentStore, InMemoryDocumentStore, StoredDocument};
