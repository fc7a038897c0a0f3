//! Evaluation result data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::exercise::Exercise;

/// Outcome of evaluating one submitted answer
///
/// Produced by an evaluator and immutable afterwards; appended to the
/// owning student's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Evaluated exercise
    pub exercise_id: String,

    /// Student who submitted the answer
    pub student_id: String,

    /// Objective the exercise targeted
    #[serde(default)]
    pub objective: Option<String>,

    /// Whether the answer is correct
    pub is_correct: bool,

    /// Optional graded score (0.0-1.0)
    #[serde(default)]
    pub score: Option<f32>,

    /// Pedagogical feedback
    #[serde(default)]
    pub feedback: String,

    /// Full mathematical explanation
    #[serde(default)]
    pub detailed_explanation: String,

    /// Step-by-step correction
    #[serde(default)]
    pub step_by_step_correction: String,

    /// Detected error categories, e.g. "sign-error"
    #[serde(default)]
    pub error_categories: Vec<String>,

    /// Personalised recommendations
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// Evaluation time
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(
        exercise_id: impl Into<String>,
        student_id: impl Into<String>,
        is_correct: bool,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            student_id: student_id.into(),
            objective: None,
            is_correct,
            score: None,
            feedback: String::new(),
            detailed_explanation: String::new(),
            step_by_step_correction: String::new(),
            error_categories: Vec::new(),
            recommendations: Vec::new(),
            evaluated_at: Utc::now(),
        }
    }

    pub fn with_error_category(mut self, category: impl Into<String>) -> Self {
        self.error_categories.push(category.into());
        self
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = Some(objective.into());
        self
    }

    /// Result used when no evaluator could judge the answer
    pub fn fallback(exercise: &Exercise, student_id: &str) -> Self {
        Self {
            objective: Some(exercise.topic.clone()),
            feedback: "The answer could not be evaluated. Please try again or give a clearer answer."
                .to_string(),
            detailed_explanation: format!("The expected solution was: {}", exercise.solution),
            step_by_step_correction: "No detailed correction is available.".to_string(),
            error_categories: vec!["unevaluated".to_string()],
            recommendations: vec![
                "Check your input".to_string(),
                "Ask your teacher if the problem persists".to_string(),
            ],
            ..Self::new(exercise.id.clone(), student_id, false)
        }
    }

    /// Identity used to ignore double recording of the same evaluation
    pub fn dedup_key(&self) -> (&str, DateTime<Utc>) {
        (self.exercise_id.as_str(), self.evaluated_at)
    }
}
