use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::llm::LlmClient;
use super::{ExerciseCreator, parse_reply, prompts};
use crate::error::{AppError, Result};
use crate::models::{Exercise, ObjectiveEntry, StudentProfile};

#[derive(Deserialize)]
struct ExerciseReply {
    exercise: String,
    #[serde(default)]
    solution: String,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

pub struct LlmExerciseCreator {
    llm: Arc<dyn LlmClient>,
}

impl LlmExerciseCreator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn generate(&self, prompt: &str) -> Result<ExerciseReply> {
        let reply: ExerciseReply = parse_reply(&self.llm.complete(prompt).await?)?;
        if reply.exercise.trim().is_empty() {
            return Err(AppError::Llm("Generated exercise is empty".to_string()));
        }
        Ok(reply)
    }
}

#[async_trait]
impl ExerciseCreator for LlmExerciseCreator {
    async fn create(&self, profile: &StudentProfile, objective: &ObjectiveEntry) -> Result<Exercise> {
        let reply = self
            .generate(&prompts::exercise_prompt(profile, objective))
            .await?;

        let mut exercise = Exercise::new(&objective.id, profile.level, reply.exercise, reply.solution)
            .with_hints(reply.hints);
        if let Some(difficulty) = reply.difficulty.filter(|d| !d.trim().is_empty()) {
            exercise.difficulty = difficulty;
        }
        tracing::debug!("Generated exercise {} for {}", exercise.id, objective.id);
        Ok(exercise)
    }

    async fn create_similar(
        &self,
        profile: &StudentProfile,
        original: &Exercise,
    ) -> Result<Exercise> {
        let reply = self
            .generate(&prompts::similar_exercise_prompt(profile, original))
            .await?;

        let mut exercise = Exercise::new(&original.topic, profile.level, reply.exercise, reply.solution)
            .with_hints(reply.hints);
        exercise.difficulty = original.difficulty.clone();
        Ok(exercise)
    }
}
