//! Embedded long-term memory
//!
//! Keeps documents in a DashMap and their embeddings in a `MemoryVectorIndex`.
//! Nothing survives the process; useful for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::error::Result;
use crate::index::{EmbeddingModel, MemoryVectorIndex, VectorIndex, VectorMetadata};
use crate::storage::{LongTermMemory, MemoryHit, MemoryQuery, MemoryRecord};

pub struct EmbeddedMemoryStore {
    records: DashMap<String, MemoryRecord>,
    index: MemoryVectorIndex,
    embedding_model: Box<dyn EmbeddingModel>,
}

impl EmbeddedMemoryStore {
    pub fn new(embedding_model: Box<dyn EmbeddingModel>) -> Self {
        Self {
            records: DashMap::new(),
            index: MemoryVectorIndex::new(embedding_model.dimension()),
            embedding_model,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LongTermMemory for EmbeddedMemoryStore {
    async fn heartbeat(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<()> {
        let vector = self.embedding_model.encode(&record.document).await?;
        let metadata = VectorMetadata {
            kind: record.kind().map(str::to_string),
            timestamp: Utc::now(),
        };
        self.index.upsert(&record.id, &vector, metadata).await?;
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.index.delete(id).await?;
        Ok(self.records.remove(id).is_some())
    }

    async fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryHit>> {
        if query.n_results == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedding_model.encode(&query.text).await?;
        let matches = self
            .index
            .search(&vector, query.kind.as_deref(), query.n_results)
            .await?;

        let hits = matches
            .into_iter()
            .filter_map(|m| {
                self.records.get(&m.id).map(|record| MemoryHit {
                    record: record.value().clone(),
                    // cosine lies in [-1, 1]
                    score: ((m.score + 1.0) / 2.0).clamp(0.0, 1.0),
                })
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::HashedEmbeddingModel;

    fn store() -> EmbeddedMemoryStore {
        EmbeddedMemoryStore::new(Box::new(HashedEmbeddingModel::new(256)))
    }

    #[tokio::test]
    async fn test_upsert_get_delete() {
        let store = store();
        let record = MemoryRecord::new("student_s1", "Alice works on fractions")
            .with_meta("type", "student_profile");

        store.upsert(record.clone()).await.unwrap();
        assert_eq!(store.get("student_s1").await.unwrap(), Some(record));

        assert!(store.delete("student_s1").await.unwrap());
        assert!(!store.delete("student_s1").await.unwrap());
        assert!(store.get("student_s1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_query_ranks_semantically_closer_documents_first() {
        let store = store();
        store
            .upsert(
                MemoryRecord::new("a", "quadratic equations discriminant roots")
                    .with_meta("type", "student_profile"),
            )
            .await
            .unwrap();
        store
            .upsert(
                MemoryRecord::new("b", "geometry triangles angles")
                    .with_meta("type", "student_profile"),
            )
            .await
            .unwrap();

        let hits = store
            .query(&MemoryQuery::new("discriminant of quadratic equations", 5))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "a");
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }

    #[tokio::test]
    async fn test_query_kind_filter_and_fewer_matches_than_requested() {
        let store = store();
        store
            .upsert(MemoryRecord::new("p", "profile text").with_meta("type", "student_profile"))
            .await
            .unwrap();
        store
            .upsert(MemoryRecord::new("x", "profile text").with_meta("type", "achievement"))
            .await
            .unwrap();

        let hits = store
            .query(&MemoryQuery::new("profile", 5).of_kind("student_profile"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "p");
    }
}
