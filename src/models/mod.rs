//! Core data models
//!
//! Student profiles plus the value objects exchanged with the tutoring agents:
//! Exercise, EvaluationResult, CoachMessage and catalog entries.

pub mod coach;
pub mod evaluation;
pub mod exercise;
pub mod objective;
pub mod student;

pub use coach::*;
pub use evaluation::*;
pub use exercise::*;
pub use objective::*;
pub use student::*;
