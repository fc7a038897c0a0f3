//! MathCoach - adaptive mathematics tutoring core
//!
//! Keeps student profiles consistent between a fast process-local store and a
//! long-term semantic memory, and drives exercise generation, evaluation and
//! coaching agents on top of them.

pub mod agents;
pub mod config;
pub mod error;
pub mod index;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use error::{AppError, Result};
