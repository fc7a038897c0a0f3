//! Index module
//!
//! Embedding models and the in-process vector index backing the embedded
//! long-term memory store.

pub mod embedding;
pub mod vector;

pub use embedding::{EmbeddingModel, HashedEmbeddingModel, create_embedding_model};
pub use vector::{MemoryVectorIndex, VectorIndex, VectorMetadata, VectorSearchResult};
