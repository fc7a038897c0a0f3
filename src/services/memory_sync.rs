//! Memory sync service
//!
//! Bridges profiles to the long-term memory collaborator:
//! - `persist`: upsert a profile under `student_{id}`
//! - `fetch`: rebuild a profile from its stored record
//! - `search`: semantic lookup of students by free text
//!
//! No retries here; the student manager decides what a failure means.

use chrono::Utc;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::StudentProfile;
use crate::storage::{KIND_KEY, LongTermMemory, MemoryQuery, MemoryRecord};

/// Record kind for serialized profiles
pub const PROFILE_KIND: &str = "student_profile";

/// Metadata key holding the full profile JSON
const PROFILE_KEY: &str = "profile";

/// Evaluations summarised in the searchable document
const SUMMARY_RECENT: usize = 5;

#[derive(Clone)]
pub struct MemorySync {
    memory: Arc<dyn LongTermMemory>,
}

impl MemorySync {
    pub fn new(memory: Arc<dyn LongTermMemory>) -> Self {
        Self { memory }
    }

    /// Record id for a student
    pub fn record_id(student_id: &str) -> String {
        format!("student_{}", student_id)
    }

    /// Is the external store reachable
    pub async fn test_connection(&self) -> bool {
        match self.memory.heartbeat().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Long-term memory heartbeat failed: {}", e);
                false
            }
        }
    }

    /// Serialize the profile and upsert it under its record id
    pub async fn persist(&self, profile: &StudentProfile) -> Result<()> {
        let record = Self::to_record(profile)?;
        self.memory.upsert(record).await.map_err(|e| {
            AppError::Persistence(format!(
                "Failed to persist profile {}: {}",
                profile.student_id, e
            ))
        })?;
        tracing::debug!("Persisted profile {} to long-term memory", profile.student_id);
        Ok(())
    }

    /// Load a profile back from the store
    ///
    /// `NotFound` if no record exists, `Deserialization` if the record is not a
    /// well-formed profile for this id. A store that cannot be reached surfaces
    /// its own error (usually `Connection`).
    pub async fn fetch(&self, student_id: &str) -> Result<StudentProfile> {
        let record = self
            .memory
            .get(&Self::record_id(student_id))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No stored profile for student {}", student_id))
            })?;

        Self::from_record(student_id, &record)
    }

    /// Semantic lookup; at most `top_k` `(student_id, score)` pairs, best first
    pub async fn search(&self, query_text: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        if top_k == 0 {
            return Err(AppError::Validation("top_k must be a positive integer".to_string()));
        }

        let query = MemoryQuery::new(query_text, top_k).of_kind(PROFILE_KIND);
        let hits = self.memory.query(&query).await?;

        let mut results: Vec<(String, f32)> = hits
            .into_iter()
            .filter_map(|hit| {
                let student_id = hit.record.meta_str("student_id")?.to_string();
                Some((student_id, hit.score))
            })
            .collect();

        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        results.truncate(top_k);
        Ok(results)
    }

    /// Remove the stored record; an absent record counts as success
    pub async fn delete(&self, student_id: &str) -> Result<()> {
        let removed = self.memory.delete(&Self::record_id(student_id)).await?;
        if !removed {
            tracing::debug!("No stored profile to delete for {}", student_id);
        }
        Ok(())
    }

    fn to_record(profile: &StudentProfile) -> Result<MemoryRecord> {
        let payload = serde_json::to_string(profile)?;
        Ok(MemoryRecord::new(Self::record_id(&profile.student_id), summarize(profile))
            .with_meta(KIND_KEY, PROFILE_KIND)
            .with_meta("student_id", profile.student_id.as_str())
            .with_meta("level", profile.level.as_str())
            .with_meta("updated_at", Utc::now().to_rfc3339())
            .with_meta(PROFILE_KEY, payload))
    }

    fn from_record(student_id: &str, record: &MemoryRecord) -> Result<StudentProfile> {
        let payload = record.meta_str(PROFILE_KEY).ok_or_else(|| {
            AppError::Deserialization(format!(
                "Stored record {} has no profile payload",
                record.id
            ))
        })?;

        let profile: StudentProfile = serde_json::from_str(payload).map_err(|e| {
            AppError::Deserialization(format!("Stored record {} is malformed: {}", record.id, e))
        })?;

        if profile.student_id != student_id {
            return Err(AppError::Deserialization(format!(
                "Stored record {} belongs to student {}",
                record.id, profile.student_id
            )));
        }

        Ok(profile)
    }
}

/// Searchable text describing the student
fn summarize(profile: &StudentProfile) -> String {
    let mut parts = vec![format!(
        "Student {} at level {}",
        profile.name.as_deref().unwrap_or("anonymous"),
        profile.level
    )];

    if let Some(objective) = &profile.current_objective {
        parts.push(format!("working on {}", objective));
    }
    if !profile.learning_objectives.is_empty() {
        let targeted: Vec<_> = profile.learning_objectives.iter().map(String::as_str).collect();
        parts.push(format!("targeting {}", targeted.join(", ")));
    }
    if !profile.objectives_completed.is_empty() {
        let done: Vec<_> = profile.objectives_completed.iter().map(String::as_str).collect();
        parts.push(format!("completed {}", done.join(", ")));
    }

    let mistakes: Vec<&str> = profile
        .recent(SUMMARY_RECENT)
        .iter()
        .filter(|e| !e.is_correct)
        .flat_map(|e| e.error_categories.iter().map(String::as_str))
        .collect();
    if !mistakes.is_empty() {
        parts.push(format!("recent mistakes: {}", mistakes.join(", ")));
    }

    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::HashedEmbeddingModel;
    use crate::models::{EvaluationResult, ProficiencyLevel};
    use crate::storage::EmbeddedMemoryStore;

    fn memory() -> Arc<dyn LongTermMemory> {
        Arc::new(EmbeddedMemoryStore::new(Box::new(HashedEmbeddingModel::new(128))))
    }

    fn profile(id: &str) -> StudentProfile {
        StudentProfile::new(id, ProficiencyLevel::Beginner).unwrap()
    }

    #[tokio::test]
    async fn test_persist_then_fetch_round_trips() {
        let sync = MemorySync::new(memory());
        let mut p = profile("s1").with_name("Alice");
        p.learning_objectives.insert("lycee::fonctions::1".into());
        p.record(EvaluationResult::new("ex1", "s1", false).with_error_category("sign-error"));

        sync.persist(&p).await.unwrap();
        let fetched = sync.fetch("s1").await.unwrap();

        assert_eq!(fetched, p);
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let sync = MemorySync::new(memory());
        assert!(matches!(sync.fetch("ghost").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_malformed_payload_is_deserialization_error() {
        let store = memory();
        store
            .upsert(
                MemoryRecord::new("student_s1", "garbage")
                    .with_meta(KIND_KEY, PROFILE_KIND)
                    .with_meta("profile", "{\"student_id\": 42"),
            )
            .await
            .unwrap();

        let sync = MemorySync::new(store);
        assert!(matches!(
            sync.fetch("s1").await,
            Err(AppError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_record_without_payload_is_deserialization_error() {
        let store = memory();
        store
            .upsert(MemoryRecord::new("student_s1", "legacy level note"))
            .await
            .unwrap();

        let sync = MemorySync::new(store);
        assert!(matches!(
            sync.fetch("s1").await,
            Err(AppError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_payload_for_other_student() {
        let store = memory();
        let other = serde_json::to_string(&profile("s2")).unwrap();
        store
            .upsert(MemoryRecord::new("student_s1", "x").with_meta("profile", other))
            .await
            .unwrap();

        let sync = MemorySync::new(store);
        assert!(matches!(
            sync.fetch("s1").await,
            Err(AppError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_search_caps_results_and_tolerates_few_matches() {
        let sync = MemorySync::new(memory());
        for id in ["a", "b"] {
            sync.persist(&profile(id)).await.unwrap();
        }

        let results = sync.search("beginner student", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));

        let results = sync.search("beginner student", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_zero_top_k() {
        let sync = MemorySync::new(memory());
        assert!(matches!(
            sync.search("anything", 0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_search_finds_student_by_mistakes() {
        let sync = MemorySync::new(memory());
        let mut a = profile("a");
        a.record(EvaluationResult::new("ex1", "a", false).with_error_category("fraction simplification"));
        let mut b = profile("b");
        b.record(EvaluationResult::new("ex2", "b", false).with_error_category("sign-error"));
        sync.persist(&a).await.unwrap();
        sync.persist(&b).await.unwrap();

        let results = sync.search("fraction simplification", 2).await.unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let sync = MemorySync::new(memory());
        assert!(sync.delete("nobody").await.is_ok());
    }

    #[test]
    fn test_summary_mentions_level_and_mistakes() {
        let mut p = profile("s1").with_name("Alice");
        p.record(EvaluationResult::new("ex1", "s1", false).with_error_category("sign-error"));
        let text = summarize(&p);
        assert!(text.contains("Alice"));
        assert!(text.contains("beginner"));
        assert!(text.contains("sign-error"));
    }
}
