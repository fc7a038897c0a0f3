use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::llm::LlmClient;
use super::{Evaluator, parse_reply, prompts};
use crate::error::Result;
use crate::models::{EvaluationResult, Exercise, StudentProfile};

#[derive(Deserialize)]
struct EvaluationReply {
    is_correct: bool,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    error_categories: Vec<String>,
    /// Single-category form some models prefer
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    detailed_explanation: String,
    #[serde(default)]
    step_by_step_correction: String,
    #[serde(default)]
    recommendations: Vec<String>,
}

pub struct LlmEvaluator {
    llm: Arc<dyn LlmClient>,
}

impl LlmEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        profile: &StudentProfile,
        exercise: &Exercise,
        answer: &str,
    ) -> Result<EvaluationResult> {
        let reply = self
            .llm
            .complete(&prompts::evaluation_prompt(exercise, answer))
            .await?;
        let parsed: EvaluationReply = parse_reply(&reply)?;

        let mut error_categories = parsed.error_categories;
        if let Some(error_type) = parsed.error_type.filter(|t| !t.trim().is_empty()) {
            if !error_categories.contains(&error_type) {
                error_categories.push(error_type);
            }
        }

        let mut result = EvaluationResult::new(&exercise.id, &profile.student_id, parsed.is_correct)
            .with_objective(&exercise.topic);
        result.score = parsed.score.map(|s| s.clamp(0.0, 1.0));
        result.feedback = parsed.feedback;
        result.detailed_explanation = parsed.detailed_explanation;
        result.step_by_step_correction = parsed.step_by_step_correction;
        result.error_categories = error_categories;
        result.recommendations = parsed.recommendations;

        tracing::debug!(
            "Evaluated exercise {} for {}: correct={}",
            exercise.id,
            profile.student_id,
            result.is_correct
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::llm::MockLlmClient;
    use crate::error::AppError;
    use crate::models::ProficiencyLevel;

    fn fixture() -> (StudentProfile, Exercise) {
        (
            StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap(),
            Exercise::new("lycee::fonctions::1", ProficiencyLevel::Beginner, "Solve 2x + 3 = 7", "x = 2"),
        )
    }

    #[tokio::test]
    async fn test_evaluate_builds_result_for_student() {
        let mut llm = MockLlmClient::new();
        llm.expect_complete()
            .withf(|prompt: &str| prompt.contains("Student answer: x = -2"))
            .returning(|_| {
                Ok(r#"{"is_correct": false, "score": 1.4, "error_type": "sign-error",
                       "feedback": "Check the sign", "recommendations": ["Redo step 2"]}"#
                    .to_string())
            });
        let evaluator = LlmEvaluator::new(Arc::new(llm));
        let (profile, exercise) = fixture();

        let result = evaluator.evaluate(&profile, &exercise, "x = -2").await.unwrap();
        assert_eq!(result.student_id, "s1");
        assert_eq!(result.exercise_id, exercise.id);
        assert_eq!(result.objective.as_deref(), Some("lycee::fonctions::1"));
        assert!(!result.is_correct);
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.error_categories, vec!["sign-error".to_string()]);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let mut llm = MockLlmClient::new();
        llm.expect_complete()
            .returning(|_| Err(AppError::Llm("timeout".into())));
        let evaluator = LlmEvaluator::new(Arc::new(llm));
        let (profile, exercise) = fixture();

        assert!(evaluator.evaluate(&profile, &exercise, "x = 2").await.is_err());
    }
}
