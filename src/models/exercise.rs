//! Exercise data model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::objective::ObjectiveEntry;
use crate::models::student::ProficiencyLevel;

/// A single exercise handed to a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Exercise identifier
    pub id: String,

    /// Objective identifier the exercise trains
    pub topic: String,

    /// Difficulty label
    pub difficulty: String,

    /// Question shown to the student
    pub prompt: String,

    /// Expected answer with worked solution
    pub solution: String,

    /// Pedagogical hints
    #[serde(default)]
    pub hints: Vec<String>,
}

impl Exercise {
    pub fn new(
        topic: impl Into<String>,
        level: ProficiencyLevel,
        prompt: impl Into<String>,
        solution: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            difficulty: level.to_string(),
            prompt: prompt.into(),
            solution: solution.into(),
            hints: Vec::new(),
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    /// Exercise built straight from catalog examples, used when no generator is reachable
    pub fn fallback(objective: &ObjectiveEntry) -> Self {
        let prompt = objective
            .example_functions
            .first()
            .map(|f| format!("Solve: {}", f))
            .or_else(|| objective.example_exercises.first().cloned())
            .unwrap_or_else(|| format!("Practice: {}", objective.description));
        let solution = objective
            .objectives
            .first()
            .map(|o| format!("Solution: {}", o))
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            topic: objective.id.clone(),
            difficulty: objective.level_name.clone(),
            prompt,
            solution,
            hints: vec!["Apply the methods seen in class".to_string()],
        }
    }
}
