//! In-process vector index

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Record kind, used as a search filter
    pub kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Default for VectorMetadata {
    fn default() -> Self {
        Self {
            kind: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector stored under `id`
    async fn upsert(&self, id: &str, vector: &[f32], metadata: VectorMetadata) -> Result<()>;
    async fn search(
        &self,
        query: &[f32],
        kind: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct MemoryVectorIndex {
    vectors: dashmap::DashMap<String, (Vec<f32>, VectorMetadata)>,
    dimension: usize,
}

impl MemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: dashmap::DashMap::new(),
            dimension,
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::Embedding(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn matches(meta: &VectorMetadata, kind: Option<&str>) -> bool {
        kind.is_none_or(|k| meta.kind.as_deref() == Some(k))
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, id: &str, vector: &[f32], metadata: VectorMetadata) -> Result<()> {
        self.check_dimension(vector)?;
        self.vectors
            .insert(id.to_string(), (vector.to_vec(), metadata));
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        kind: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        self.check_dimension(query)?;

        let mut results: Vec<_> = self
            .vectors
            .iter()
            .filter(|ref_multi| Self::matches(&ref_multi.value().1, kind))
            .map(|ref_multi| {
                let (id, (vector, meta)) = ref_multi.pair();
                VectorSearchResult {
                    id: id.clone(),
                    score: Self::cosine_similarity(query, vector),
                    metadata: meta.clone(),
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);

        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.vectors.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(kind: &str) -> VectorMetadata {
        VectorMetadata {
            kind: Some(kind.to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_vector_index_upsert_and_search() {
        let index = MemoryVectorIndex::new(3);

        index.upsert("a", &[1.0, 0.0, 0.0], meta("student_profile")).await.unwrap();
        index.upsert("b", &[0.0, 1.0, 0.0], meta("student_profile")).await.unwrap();

        let results = index
            .search(&[0.9, 0.1, 0.0], Some("student_profile"), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_search_filters_by_kind_and_limit() {
        let index = MemoryVectorIndex::new(3);
        index.upsert("p1", &[1.0, 0.0, 0.0], meta("student_profile")).await.unwrap();
        index.upsert("p2", &[1.0, 1.0, 0.0], meta("student_profile")).await.unwrap();
        index.upsert("e1", &[1.0, 0.0, 0.0], meta("exercise")).await.unwrap();

        let results = index
            .search(&[1.0, 0.0, 0.0], Some("student_profile"), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");

        assert_eq!(index.search(&[1.0, 0.0, 0.0], None, 10).await.unwrap().len(), 3);
        let exercises = index.search(&[1.0, 0.0, 0.0], Some("exercise"), 10).await.unwrap();
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].id, "e1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_vector() {
        let index = MemoryVectorIndex::new(3);
        index.upsert("a", &[1.0, 0.0, 0.0], meta("k")).await.unwrap();
        index.upsert("a", &[0.0, 0.0, 1.0], meta("k")).await.unwrap();

        let results = index.search(&[0.0, 0.0, 1.0], None, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_memory_vector_index_delete() {
        let index = MemoryVectorIndex::new(3);
        index.upsert("vec_1", &[0.1, 0.1, 0.1], meta("k")).await.unwrap();

        assert!(index.delete("vec_1").await.unwrap());
        assert!(!index.delete("vec_1").await.unwrap());
        assert!(index.search(&[0.1, 0.1, 0.1], None, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let index = MemoryVectorIndex::new(3);
        let err = index.upsert("a", &[1.0, 0.0], meta("k")).await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert_eq!(MemoryVectorIndex::cosine_similarity(&a, &b), 1.0);
        assert_eq!(MemoryVectorIndex::cosine_similarity(&a, &c), 0.0);
    }
}
