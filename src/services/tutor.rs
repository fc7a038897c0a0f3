//! Tutor service
//!
//! Thin orchestration over the student manager and the tutoring agents. An
//! agent that is missing or fails never blocks a session: exercises fall back
//! to catalog examples, evaluations to an "unevaluated" result and coaching to
//! a stock message.

use serde::Serialize;
use std::sync::Arc;

use crate::agents::{Coach, Evaluator, ExerciseCreator, LlmClient, LlmCoach, LlmEvaluator, LlmExerciseCreator};
use crate::error::{AppError, Result};
use crate::models::{CoachMessage, EvaluationResult, Exercise, ObjectiveEntry, ProficiencyLevel};
use crate::services::student_manager::{StudentManager, SyncState, WriteOutcome};

/// Snapshot of a student's progress
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub student_id: String,
    pub level: ProficiencyLevel,
    pub current_objective: Option<String>,
    pub objectives_completed: usize,
    pub exercises_done: usize,
    pub accuracy: Option<f32>,
    #[serde(skip)]
    pub sync_state: SyncState,
}

pub struct TutorService {
    students: StudentManager,
    creator: Option<Arc<dyn ExerciseCreator>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    coach: Option<Arc<dyn Coach>>,
}

impl TutorService {
    pub fn new(students: StudentManager) -> Self {
        Self {
            students,
            creator: None,
            evaluator: None,
            coach: None,
        }
    }

    /// Wire every agent role to the same language model
    pub fn with_llm(self, llm: Arc<dyn LlmClient>) -> Self {
        self.with_creator(Arc::new(LlmExerciseCreator::new(llm.clone())))
            .with_evaluator(Arc::new(LlmEvaluator::new(llm.clone())))
            .with_coach(Arc::new(LlmCoach::new(llm)))
    }

    pub fn with_creator(mut self, creator: Arc<dyn ExerciseCreator>) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_coach(mut self, coach: Arc<dyn Coach>) -> Self {
        self.coach = Some(coach);
        self
    }

    pub fn students(&self) -> &StudentManager {
        &self.students
    }

    pub fn students_mut(&mut self) -> &mut StudentManager {
        &mut self.students
    }

    /// Exercise for the student's current objective, or the first recommended one
    pub async fn next_exercise(&mut self, student_id: &str) -> Result<Exercise> {
        let level = self.students.default_level();
        let profile = self.students.get_or_create(student_id, level).await?;
        let objective = self.pick_objective(student_id)?;

        if let Some(creator) = &self.creator {
            match creator.create(&profile, &objective).await {
                Ok(exercise) => return Ok(exercise),
                Err(e) => tracing::warn!(
                    "Exercise generation failed for {}, using catalog example: {}",
                    objective.id,
                    e
                ),
            }
        }

        Ok(Exercise::fallback(&objective))
    }

    /// Variation of an exercise, falling back to the catalog example of its topic
    pub async fn similar_exercise(&self, student_id: &str, original: &Exercise) -> Result<Exercise> {
        let profile = self.students.get(student_id)?;

        if let Some(creator) = &self.creator {
            match creator.create_similar(profile, original).await {
                Ok(exercise) => return Ok(exercise),
                Err(e) => tracing::warn!(
                    "Similar exercise generation failed for {}: {}",
                    original.id,
                    e
                ),
            }
        }

        Ok(match self.students.catalog().get(&original.topic) {
            Some(objective) => Exercise::fallback(objective),
            None => Exercise::new(
                &original.topic,
                profile.level,
                &original.prompt,
                &original.solution,
            )
            .with_hints(original.hints.clone()),
        })
    }

    /// Evaluate an answer and record the result on the student's profile
    ///
    /// The evaluation is recorded even when long-term memory is unreachable;
    /// the returned outcome carries the sync state.
    pub async fn submit_answer(
        &mut self,
        student_id: &str,
        exercise: &Exercise,
        answer: &str,
    ) -> Result<(EvaluationResult, WriteOutcome)> {
        let profile = self.students.get(student_id)?.clone();

        let evaluation = match &self.evaluator {
            Some(evaluator) => match evaluator.evaluate(&profile, exercise, answer).await {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    tracing::warn!("Evaluation of {} failed, recording fallback: {}", exercise.id, e);
                    EvaluationResult::fallback(exercise, student_id)
                }
            },
            None => EvaluationResult::fallback(exercise, student_id),
        };

        let outcome = self
            .students
            .record_evaluation(student_id, evaluation.clone())
            .await?;
        Ok((evaluation, outcome))
    }

    pub async fn coach(&self, student_id: &str) -> Result<CoachMessage> {
        let profile = self.students.get(student_id)?;

        if let Some(coach) = &self.coach {
            match coach.coach(profile).await {
                Ok(message) => return Ok(message),
                Err(e) => tracing::warn!("Coaching failed for {}: {}", student_id, e),
            }
        }

        Ok(CoachMessage::fallback())
    }

    pub fn progress(&self, student_id: &str) -> Result<Progress> {
        let profile = self.students.get(student_id)?;
        Ok(Progress {
            student_id: profile.student_id.clone(),
            level: profile.level,
            current_objective: profile.current_objective.clone(),
            objectives_completed: profile.objectives_completed.len(),
            exercises_done: profile.history.len(),
            accuracy: profile.accuracy(),
            sync_state: self.students.state(student_id),
        })
    }

    fn pick_objective(&self, student_id: &str) -> Result<ObjectiveEntry> {
        let catalog = self.students.catalog();
        let profile = self.students.get(student_id)?;

        if let Some(entry) = profile
            .current_objective
            .as_deref()
            .and_then(|id| catalog.get(id))
        {
            return Ok(entry.clone());
        }

        self.students
            .recommend_objectives(student_id)?
            .iter()
            .find_map(|id| catalog.get(id))
            .cloned()
            .ok_or_else(|| {
                AppError::Validation(format!("No objective left to practise for {}", student_id))
            })
    }
}
