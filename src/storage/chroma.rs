//! ChromaDB long-term memory backend
//!
//! Talks to the Chroma v1 REST API. Embeddings are computed on our side with the
//! configured `EmbeddingModel`, so the server only stores and ranks vectors.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::index::EmbeddingModel;
use crate::storage::{LongTermMemory, MemoryHit, MemoryQuery, MemoryRecord, Metadata};

pub struct ChromaMemoryStore {
    client: reqwest::Client,
    base_url: String,
    collection_name: String,
    collection_id: OnceCell<String>,
    embedding_model: Box<dyn EmbeddingModel>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl ChromaMemoryStore {
    pub fn new(
        base_url: &str,
        collection_name: &str,
        embedding_model: Box<dyn EmbeddingModel>,
        timeout: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection_name: collection_name.to_string(),
            collection_id: OnceCell::new(),
            embedding_model,
        })
    }

    /// Resolve (creating if needed) the collection id, once per store
    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections", self.base_url);
                let body = json!({ "name": self.collection_name, "get_or_create": true });
                let value = self.post_json(&url, &body).await?;
                let collection: CollectionResponse = serde_json::from_value(value)?;
                tracing::debug!(
                    "Resolved Chroma collection '{}' -> {}",
                    self.collection_name,
                    collection.id
                );
                Ok::<_, AppError>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn collection_url(&self, op: &str) -> Result<String> {
        let id = self.collection_id().await?;
        Ok(format!("{}/api/v1/collections/{}/{}", self.base_url, id, op))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("Chroma POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Chroma request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Chroma error {}: {}",
                status, error_text
            )));
        }

        let text = response.text().await.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn distance_to_score(distance: f32) -> f32 {
        1.0 / (1.0 + distance.max(0.0))
    }
}

#[async_trait]
impl LongTermMemory for ChromaMemoryStore {
    async fn heartbeat(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/v1/heartbeat", self.base_url))
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Chroma heartbeat failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Connection(format!(
                "Chroma heartbeat returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<()> {
        let embedding = self.embedding_model.encode(&record.document).await?;
        let url = self.collection_url("upsert").await?;
        let body = json!({
            "ids": [record.id],
            "embeddings": [embedding],
            "documents": [record.document],
            "metadatas": [record.metadata],
        });
        self.post_json(&url, &body).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let url = self.collection_url("get").await?;
        let body = json!({ "ids": [id], "include": ["documents", "metadatas"] });
        let value = self.post_json(&url, &body).await?;
        let response: GetResponse = serde_json::from_value(value)?;

        let Some(position) = response.ids.iter().position(|found| found == id) else {
            return Ok(None);
        };

        let document = response
            .documents
            .and_then(|docs| docs.into_iter().nth(position).flatten())
            .unwrap_or_default();
        let metadata = response
            .metadatas
            .and_then(|metas| metas.into_iter().nth(position).flatten())
            .unwrap_or_default();

        Ok(Some(MemoryRecord {
            id: id.to_string(),
            document,
            metadata,
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if self.get(id).await?.is_none() {
            return Ok(false);
        }
        let url = self.collection_url("delete").await?;
        self.post_json(&url, &json!({ "ids": [id] })).await?;
        Ok(true)
    }

    async fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryHit>> {
        if query.n_results == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedding_model.encode(&query.text).await?;
        let url = self.collection_url("query").await?;
        let mut body = json!({
            "query_embeddings": [embedding],
            "n_results": query.n_results,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(kind) = &query.kind {
            body["where"] = json!({ "type": kind });
        }

        let value = self.post_json(&url, &body).await?;
        let response: QueryResponse = serde_json::from_value(value)?;

        let ids = response.ids.into_iter().next().unwrap_or_default();
        let mut documents = response
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut metadatas = response
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut distances = response
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        let mut hits: Vec<MemoryHit> = ids
            .into_iter()
            .map(|id| MemoryHit {
                record: MemoryRecord {
                    id,
                    document: documents.next().flatten().unwrap_or_default(),
                    metadata: metadatas.next().flatten().unwrap_or_default(),
                },
                score: distances.next().map(Self::distance_to_score).unwrap_or(0.0),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.n_results);
        Ok(hits)
    }
}
