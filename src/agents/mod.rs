//! Tutoring agents
//!
//! Each role is a trait with a single capability. The LLM-backed
//! implementations share one `LlmClient`; callers decide what to do when an
//! agent fails (usually fall back to the catalog-based defaults).

pub mod coach;
pub mod evaluator;
pub mod exercise_creator;
pub mod llm;
pub mod prompts;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{CoachMessage, EvaluationResult, Exercise, ObjectiveEntry, StudentProfile};

pub use coach::LlmCoach;
pub use evaluator::LlmEvaluator;
pub use exercise_creator::LlmExerciseCreator;
pub use llm::{LlmClient, OpenAiCompatibleClient, create_llm_client};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExerciseCreator: Send + Sync {
    /// New exercise for an objective, pitched at the student's level
    async fn create(&self, profile: &StudentProfile, objective: &ObjectiveEntry) -> Result<Exercise>;

    /// Variation of an exercise the student has already seen
    async fn create_similar(&self, profile: &StudentProfile, original: &Exercise)
    -> Result<Exercise>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        profile: &StudentProfile,
        exercise: &Exercise,
        answer: &str,
    ) -> Result<EvaluationResult>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Coach: Send + Sync {
    async fn coach(&self, profile: &StudentProfile) -> Result<CoachMessage>;
}

/// Deserialize the first JSON object found in a model reply
///
/// Models wrap JSON in prose or code fences; anything before the first `{`
/// and after the matching `}` is ignored.
pub(crate) fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let start = reply
        .find('{')
        .ok_or_else(|| AppError::Llm("Reply contains no JSON object".to_string()))?;

    let mut de = serde_json::Deserializer::from_str(&reply[start..]);
    let value: T = serde::Deserialize::deserialize(&mut de)
        .map_err(|e| AppError::Llm(format!("Malformed JSON in reply: {}", e)))?;
    Ok(value)
}
