//! Student profile data model
//!
//! One learner's persistent learning state: level, targeted objectives and
//! the evaluation history accumulated across tutoring cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::evaluation::EvaluationResult;

/// Proficiency tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    /// Catalog tier (1-based) matching this level
    pub fn tier(&self) -> u8 {
        match self {
            ProficiencyLevel::Beginner => 1,
            ProficiencyLevel::Intermediate => 2,
            ProficiencyLevel::Advanced => 3,
        }
    }

    /// Level for a catalog tier
    pub fn from_tier(tier: u8) -> Option<Self> {
        match tier {
            1 => Some(ProficiencyLevel::Beginner),
            2 => Some(ProficiencyLevel::Intermediate),
            3 => Some(ProficiencyLevel::Advanced),
            _ => None,
        }
    }

    /// Promotion target; `Advanced` is the ceiling
    pub fn next(&self) -> Self {
        match self {
            ProficiencyLevel::Beginner => ProficiencyLevel::Intermediate,
            ProficiencyLevel::Intermediate | ProficiencyLevel::Advanced => {
                ProficiencyLevel::Advanced
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "beginner" => Ok(ProficiencyLevel::Beginner),
            "intermediate" => Ok(ProficiencyLevel::Intermediate),
            "advanced" => Ok(ProficiencyLevel::Advanced),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(ProficiencyLevel::from_tier)
                .ok_or_else(|| AppError::Validation(format!("Unknown proficiency level: {}", s))),
        }
    }
}

/// Student profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Primary key, immutable after creation
    pub student_id: String,

    /// Display name
    pub name: Option<String>,

    /// Current proficiency tier
    pub level: ProficiencyLevel,

    /// Objective currently being worked on
    #[serde(default)]
    pub current_objective: Option<String>,

    /// Evaluations in the order they were recorded
    #[serde(default)]
    pub history: Vec<EvaluationResult>,

    /// Objectives currently targeted
    #[serde(default)]
    pub learning_objectives: BTreeSet<String>,

    /// Objectives already mastered
    #[serde(default)]
    pub objectives_completed: BTreeSet<String>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last tutoring activity
    #[serde(default)]
    pub last_session: Option<DateTime<Utc>>,
}

impl StudentProfile {
    /// Create an empty profile
    ///
    /// Fails with `Validation` when `student_id` is blank.
    pub fn new(student_id: impl Into<String>, level: ProficiencyLevel) -> Result<Self> {
        let student_id = student_id.into();
        validate_student_id(&student_id)?;

        Ok(Self {
            student_id,
            name: None,
            level,
            current_objective: None,
            history: Vec::new(),
            learning_objectives: BTreeSet::new(),
            objectives_completed: BTreeSet::new(),
            created_at: Utc::now(),
            last_session: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Identifier for students created without one: a 16-digit timestamp
    /// followed by 8 random hex digits, so ids minted by separate processes
    /// do not collide in long-term memory
    pub fn generate_id() -> String {
        let mut stamp = Utc::now().format("%Y%m%d%H%M%S%f").to_string();
        stamp.truncate(16);
        let random = Uuid::new_v4().simple().to_string();
        format!("{}_{}", stamp, &random[..8])
    }

    /// Whether an evaluation with the same exercise and timestamp was already recorded
    pub fn has_evaluation(&self, evaluation: &EvaluationResult) -> bool {
        self.history
            .iter()
            .any(|entry| entry.dedup_key() == evaluation.dedup_key())
    }

    /// Append an evaluation and mark the session as active
    pub fn record(&mut self, evaluation: EvaluationResult) {
        self.last_session = Some(evaluation.evaluated_at);
        self.history.push(evaluation);
    }

    /// Move an objective from the targeted set to the completed set
    pub fn complete_objective(&mut self, objective_id: &str) {
        self.learning_objectives.remove(objective_id);
        self.objectives_completed.insert(objective_id.to_string());
        if self.current_objective.as_deref() == Some(objective_id) {
            self.current_objective = None;
        }
    }

    /// Merge a local copy that was created without seeing the stored profile
    ///
    /// `self` is the stored profile and wins for identity fields. Local
    /// evaluations missing from the stored history are appended, objective
    /// sets are unioned and the higher level is kept.
    pub fn reconcile(mut self, local: StudentProfile) -> StudentProfile {
        for evaluation in local.history {
            if !self.has_evaluation(&evaluation) {
                self.history.push(evaluation);
            }
        }

        self.objectives_completed.extend(local.objectives_completed);
        self.learning_objectives.extend(local.learning_objectives);
        let completed = &self.objectives_completed;
        self.learning_objectives.retain(|id| !completed.contains(id));

        if local.current_objective.is_some() {
            self.current_objective = local.current_objective;
        }
        if let Some(id) = &self.current_objective {
            if self.objectives_completed.contains(id) {
                self.current_objective = None;
            }
        }

        if self.name.is_none() {
            self.name = local.name;
        }
        self.level = self.level.max(local.level);
        self.last_session = self.last_session.max(local.last_session);
        self
    }

    /// Share of correct answers over the whole history
    pub fn accuracy(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        let correct = self.history.iter().filter(|e| e.is_correct).count();
        Some(correct as f32 / self.history.len() as f32)
    }

    /// The `n` most recent evaluations, newest last
    pub fn recent(&self, n: usize) -> &[EvaluationResult] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

/// Student identifiers must be non-empty and free of path separators,
/// since they double as snapshot file names.
pub fn validate_student_id(student_id: &str) -> Result<()> {
    if student_id.trim().is_empty() {
        return Err(AppError::Validation("student_id must not be empty".to_string()));
    }
    if student_id.contains(['/', '\\']) || student_id == "." || student_id == ".." {
        return Err(AppError::Validation(format!(
            "student_id contains invalid characters: {}",
            student_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("beginner", ProficiencyLevel::Beginner)]
    #[case("Intermediate", ProficiencyLevel::Intermediate)]
    #[case(" ADVANCED ", ProficiencyLevel::Advanced)]
    #[case("1", ProficiencyLevel::Beginner)]
    #[case("3", ProficiencyLevel::Advanced)]
    fn test_level_parsing(#[case] input: &str, #[case] expected: ProficiencyLevel) {
        assert_eq!(input.parse::<ProficiencyLevel>().unwrap(), expected);
    }

    #[rstest]
    #[case("expert")]
    #[case("4")]
    #[case("")]
    fn test_level_parsing_rejects_unknown(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ProficiencyLevel>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_level_promotion_caps_at_advanced() {
        assert_eq!(ProficiencyLevel::Beginner.next(), ProficiencyLevel::Intermediate);
        assert_eq!(ProficiencyLevel::Advanced.next(), ProficiencyLevel::Advanced);
    }

    #[test]
    fn test_new_profile_is_empty() {
        let profile = StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap();
        assert_eq!(profile.student_id, "s1");
        assert_eq!(profile.level, ProficiencyLevel::Beginner);
        assert!(profile.history.is_empty());
        assert!(profile.accuracy().is_none());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("../etc")]
    #[case("a/b")]
    fn test_invalid_student_ids_rejected(#[case] id: &str) {
        assert!(matches!(
            StudentProfile::new(id, ProficiencyLevel::Beginner),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_generated_id_has_timestamp_and_random_suffix() {
        let id = StudentProfile::generate_id();
        let (stamp, random) = id.split_once('_').unwrap();
        assert_eq!(stamp.len(), 16);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(random.len(), 8);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(validate_student_id(&id).is_ok());
    }

    #[test]
    fn test_generated_ids_differ_within_one_tick() {
        let ids: BTreeSet<String> = (0..50).map(|_| StudentProfile::generate_id()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_reconcile_keeps_stored_data_and_adds_local_work() {
        let mut stored = StudentProfile::new("s1", ProficiencyLevel::Advanced)
            .unwrap()
            .with_name("Alice");
        let shared = EvaluationResult::new("ex1", "s1", true);
        stored.record(shared.clone());
        stored.objectives_completed.insert("lycee::fonctions::1".into());

        let mut local = StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap();
        local.record(shared);
        local.record(EvaluationResult::new("ex2", "s1", false));
        local.learning_objectives.insert("lycee::fonctions::1".into());
        local.learning_objectives.insert("lycee::probabilites::1".into());
        local.current_objective = Some("lycee::probabilites::1".into());

        let merged = stored.clone().reconcile(local);

        assert_eq!(merged.level, ProficiencyLevel::Advanced);
        assert_eq!(merged.name.as_deref(), Some("Alice"));
        assert_eq!(merged.created_at, stored.created_at);
        assert_eq!(
            merged.history.iter().map(|e| e.exercise_id.as_str()).collect::<Vec<_>>(),
            vec!["ex1", "ex2"]
        );
        assert_eq!(
            merged.learning_objectives.into_iter().collect::<Vec<_>>(),
            vec!["lycee::probabilites::1".to_string()]
        );
        assert_eq!(merged.current_objective.as_deref(), Some("lycee::probabilites::1"));
    }

    #[test]
    fn test_complete_objective_moves_between_sets() {
        let mut profile = StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap();
        profile.learning_objectives.insert("lycee::fonctions::1".into());
        profile.current_objective = Some("lycee::fonctions::1".into());

        profile.complete_objective("lycee::fonctions::1");

        assert!(profile.learning_objectives.is_empty());
        assert!(profile.objectives_completed.contains("lycee::fonctions::1"));
        assert!(profile.current_objective.is_none());
    }

    #[test]
    fn test_accuracy_and_recent() {
        let mut profile = StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap();
        for (i, correct) in [true, false, true, true].into_iter().enumerate() {
            let mut eval = EvaluationResult::new(format!("ex{}", i), "s1", correct);
            eval.feedback = format!("attempt {}", i);
            profile.record(eval);
        }

        assert_eq!(profile.accuracy(), Some(0.75));
        let recent = profile.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].exercise_id, "ex3");
        assert_eq!(profile.recent(10).len(), 4);
    }
}
