//! Prompt templates for the tutoring agents

use crate::models::{EvaluationResult, Exercise, ObjectiveEntry, StudentProfile};

const EXERCISE_FORMAT: &str = r#"Reply with a single JSON object:
{"exercise": "...", "solution": "...", "hints": ["...", "..."], "difficulty": "..."}"#;

pub fn exercise_prompt(profile: &StudentProfile, objective: &ObjectiveEntry) -> String {
    let based_on = objective
        .example_functions
        .first()
        .or_else(|| objective.example_exercises.first())
        .map(String::as_str)
        .unwrap_or("-");

    format!(
        r#"You are an expert mathematics teacher. Create one exercise with:
- Objective: {description}
- Level: {level_name} (student level: {student_level})
- Skills: {skills}
- Based on: {based_on}

The exercise must be clear and precise, have a detailed solution, include 2-3 pedagogical hints
and match the difficulty level.

{format}"#,
        description = objective.description,
        level_name = objective.level_name,
        student_level = profile.level,
        skills = objective.objectives.join("; "),
        based_on = based_on,
        format = EXERCISE_FORMAT,
    )
}

pub fn similar_exercise_prompt(profile: &StudentProfile, original: &Exercise) -> String {
    format!(
        r#"You are an expert mathematics teacher. Create a new exercise SIMILAR to the one below,
with different values or context, adapted to a {level} student.

Original exercise: {prompt}
Original solution: {solution}
Concept: {topic}
Difficulty: {difficulty}

The new exercise must keep the concept and difficulty, vary enough not to be a repetition,
have a detailed solution and include 2-3 pedagogical hints.

{format}"#,
        level = profile.level,
        prompt = original.prompt,
        solution = original.solution,
        topic = original.topic,
        difficulty = original.difficulty,
        format = EXERCISE_FORMAT,
    )
}

pub fn evaluation_prompt(exercise: &Exercise, answer: &str) -> String {
    format!(
        r#"Evaluate the student's answer to the following exercise.
Exercise: {prompt}
Expected solution: {solution}
Student answer: {answer}

Give a precise, pedagogical evaluation, name each error and explain it.
Reply with a single JSON object:
{{"is_correct": true, "score": 0.0, "error_categories": ["..."], "feedback": "...",
"detailed_explanation": "...", "step_by_step_correction": "...", "recommendations": ["..."]}}"#,
        prompt = exercise.prompt,
        solution = exercise.solution,
        answer = answer,
    )
}

pub fn coach_prompt(profile: &StudentProfile) -> String {
    let recent: Vec<String> = profile.recent(5).iter().map(describe).collect();
    let accuracy = profile
        .accuracy()
        .map(|a| format!("{:.0}%", a * 100.0))
        .unwrap_or_else(|| "no answers yet".to_string());

    format!(
        r#"You are a caring personal mathematics coach. Motivate this student and give a study strategy.
Level: {level}
Accuracy: {accuracy}
Current objective: {objective}
Recent results:
{recent}

Reply with a single JSON object:
{{"motivation": "...", "strategy": "...", "tip": "...", "encouragement": ["..."], "next_steps": ["..."]}}"#,
        level = profile.level,
        accuracy = accuracy,
        objective = profile.current_objective.as_deref().unwrap_or("none"),
        recent = if recent.is_empty() {
            "- none".to_string()
        } else {
            recent.join("\n")
        },
    )
}

fn describe(evaluation: &EvaluationResult) -> String {
    if evaluation.is_correct {
        format!("- {}: correct", evaluation.exercise_id)
    } else if evaluation.error_categories.is_empty() {
        format!("- {}: incorrect", evaluation.exercise_id)
    } else {
        format!(
            "- {}: incorrect ({})",
            evaluation.exercise_id,
            evaluation.error_categories.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProficiencyLevel;

    #[test]
    fn test_coach_prompt_lists_recent_mistakes() {
        let mut profile = StudentProfile::new("s1", ProficiencyLevel::Beginner).unwrap();
        profile.record(EvaluationResult::new("ex1", "s1", false).with_error_category("sign-error"));
        profile.record(EvaluationResult::new("ex2", "s1", true));

        let prompt = coach_prompt(&profile);
        assert!(prompt.contains("- ex1: incorrect (sign-error)"));
        assert!(prompt.contains("- ex2: correct"));
        assert!(prompt.contains("Accuracy: 50%"));
    }

    #[test]
    fn test_evaluation_prompt_includes_answer_and_solution() {
        let exercise = Exercise::new("t", ProficiencyLevel::Beginner, "Solve 2x = 4", "x = 2");
        let prompt = evaluation_prompt(&exercise, "x = 3");
        assert!(prompt.contains("Student answer: x = 3"));
        assert!(prompt.contains("Expected solution: x = 2"));
    }
}
