//! Storage layer
//!
//! - `profile_store`: authoritative process-local profile registry
//! - `LongTermMemory`: external key/value + semantic search store, with an
//!   embedded backend and a Chroma REST backend
//! - `backup`: local snapshots written when a sync to long-term memory fails

pub mod backup;
pub mod chroma;
pub mod embedded;
pub mod profile_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::config::{EmbeddingConfig, MemoryConfig};
use crate::error::{AppError, Result};
use crate::index::create_embedding_model;

pub use backup::BackupWriter;
pub use chroma::ChromaMemoryStore;
pub use embedded::EmbeddedMemoryStore;
pub use profile_store::{ProfileStore, SyncMark};

/// Flat scalar metadata, the lowest common denominator of vector stores
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key carrying the record kind
pub const KIND_KEY: &str = "type";

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    /// Text that semantic search runs against
    pub document: String,
    pub metadata: Metadata,
}

impl MemoryRecord {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.metadata.get(KIND_KEY).and_then(|v| v.as_str())
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Semantic lookup request
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    pub text: String,
    pub n_results: usize,
    /// Restrict to records whose `type` metadata equals this value
    pub kind: Option<String>,
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>, n_results: usize) -> Self {
        Self {
            text: text.into(),
            n_results,
            kind: None,
        }
    }

    pub fn of_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// A search match, most relevant first
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub record: MemoryRecord,
    /// Relevance in [0, 1], higher is better
    pub score: f32,
}

/// Long-term memory collaborator
///
/// Implementations do not retry; callers decide the retry policy.
#[async_trait]
pub trait LongTermMemory: Send + Sync {
    /// Cheap reachability check
    async fn heartbeat(&self) -> Result<()>;

    /// Insert or replace the record stored under `record.id`
    async fn upsert(&self, record: MemoryRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<MemoryRecord>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Up to `n_results` matches ordered by descending relevance
    async fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryHit>>;
}

/// Build the configured long-term memory backend
pub fn create_long_term_memory(
    memory: &MemoryConfig,
    embedding: &EmbeddingConfig,
) -> Result<Box<dyn LongTermMemory>> {
    let model = create_embedding_model(embedding)?;
    match memory.backend.as_str() {
        "embedded" | "" => Ok(Box::new(EmbeddedMemoryStore::new(model))),
        "chroma" => Ok(Box::new(ChromaMemoryStore::new(
            &memory.url,
            &memory.collection,
            model,
            memory.timeout,
        )?)),
        other => Err(AppError::Config(format!(
            "Unknown memory backend: {}",
            other
        ))),
    }
}
