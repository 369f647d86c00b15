//! Document store for uploaded and redacted documents
//!
//! The `DocumentStore` trait is injected into the HTTP layer so the in-memory
//! implementation can be swapped for a persistent one. Entries expire after a
//! configured time-to-live and can be deleted explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use redactline_pii::AuditTrail;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of redacting a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRedaction {
    pub redacted_text: String,
    pub audit_trail: AuditTrail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: usize,
    pub extracted_text: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redaction: Option<StoredRedaction>,
}

/// Key-value store for documents awaiting review or download
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, replacing any entry with the same id
    async fn put(&self, document: StoredDocument) -> StoreResult<()>;

    /// Fetch a live document
    async fn get(&self, id: &str) -> StoreResult<Option<StoredDocument>>;

    /// Attach a redaction to an existing document
    ///
    /// # Errors
    /// - `StoreError::NotFound` if the document is absent or expired
    async fn update_redaction(&self, id: &str, redaction: StoredRedaction) -> StoreResult<()>;

    /// Live documents, oldest upload first
    async fn list(&self) -> StoreResult<Vec<StoredDocument>>;

    /// Delete a document, returning whether it existed
    async fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Drop expired documents, returning how many were removed
    async fn purge_expired(&self) -> StoreResult<usize>;
}

struct Entry {
    document: StoredDocument,
    inserted: Instant,
    sequence: u64,
}

/// In-process store with a time-to-live and a capacity cap.
///
/// When full, inserting evicts the oldest entry.
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Entry>,
    next_sequence: AtomicU64,
    ttl: Duration,
    max_documents: usize,
}

impl InMemoryDocumentStore {
    pub fn new(ttl: Duration, max_documents: usize) -> Self {
        Self {
            documents: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            ttl,
            max_documents: max_documents.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.inserted.elapsed() >= self.ttl
    }

    fn evict_oldest(&self) {
        let oldest = self
            .documents
            .iter()
            .min_by_key(|entry| entry.value().sequence)
            .map(|entry| entry.key().clone());

        if let Some(id) = oldest {
            debug!(document_id = %id, "Evicting oldest document to stay under capacity");
            self.documents.remove(&id);
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, document: StoredDocument) -> StoreResult<()> {
        if !self.documents.contains_key(&document.id) {
            while self.documents.len() >= self.max_documents {
                self.evict_oldest();
            }
        }

        self.documents.insert(
            document.id.clone(),
            Entry {
                document,
                inserted: Instant::now(),
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<StoredDocument>> {
        let expired = match self.documents.get(id) {
            Some(entry) if !self.is_expired(&entry) => return Ok(Some(entry.document.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.documents.remove(id);
        }
        Ok(None)
    }

    async fn update_redaction(&self, id: &str, redaction: StoredRedaction) -> StoreResult<()> {
        match self.documents.get_mut(id) {
            Some(mut entry) if !self.is_expired(&entry) => {
                entry.document.redaction = Some(redaction);
                Ok(())
            }
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list(&self) -> StoreResult<Vec<StoredDocument>> {
        let mut live: Vec<(u64, StoredDocument)> = self
            .documents
            .iter()
            .filter(|entry| !self.is_expired(entry.value()))
            .map(|entry| (entry.sequence, entry.document.clone()))
            .collect();
        live.sort_by_key(|(sequence, _)| *sequence);

        Ok(live.into_iter().map(|(_, document)| document).collect())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        Ok(self.documents.remove(id).is_some())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let before = self.documents.len();
        self.documents.retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        Ok(before - self.documents.len())
    }
}

/// Purge expired documents every `period` until the task is aborted
pub fn spawn_purge_task(store: Arc<dyn DocumentStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired documents"),
                Err(e) => warn!(error = %e, "Failed to purge expired documents"),
            }
        }
    })
}
