//! Sync failure backups
//!
//! When a profile cannot be written to long-term memory, a timestamped copy is
//! dropped into `{data_dir}/backups/` so an operator can replay it later.

use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::StudentProfile;

#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: data_dir.into().join("backups"),
        }
    }

    /// Write `{timestamp}_{student_id}.json` and return its path
    pub fn write(&self, profile: &StudentProfile, error: &AppError) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let now = Utc::now();
        let file = self.dir.join(format!(
            "{}_{}.json",
            now.format("%Y%m%d_%H%M%S%.6f"),
            profile.student_id
        ));
        let body = json!({
            "student": profile,
            "error": error.to_string(),
            "error_code": error.code(),
            "timestamp": now.to_rfc3339(),
            "attempt": "memory_sync",
        });
        std::fs::write(&file, serde_json::to_string_pretty(&body)?)?;

        Ok(file)
    }
}
