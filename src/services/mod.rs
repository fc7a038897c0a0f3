//! Service layer

pub mod memory_sync;
pub mod objectives;
pub mod student_manager;
pub mod tutor;

use std::sync::Arc;

use crate::agents::create_llm_client;
use crate::config::AppConfig;
use crate::error::Result;
use crate::storage::create_long_term_memory;

pub use memory_sync::{MemorySync, PROFILE_KIND};
pub use objectives::ObjectivesCatalog;
pub use student_manager::{FlushReport, StudentManager, SyncState, WriteOutcome};
pub use tutor::{Progress, TutorService};

/// Build the student manager and its collaborators from configuration
pub async fn create_student_manager(config: &AppConfig) -> Result<StudentManager> {
    let memory = create_long_term_memory(&config.memory, &config.embedding)?;
    let sync = MemorySync::new(Arc::from(memory));
    if !sync.test_connection().await {
        tracing::warn!(
            "Long-term memory ({}) is unreachable, profiles will stay dirty until it returns",
            config.memory.backend
        );
    }

    let catalog = Arc::new(ObjectivesCatalog::load(&config.objectives.catalog_path)?);
    StudentManager::from_config(&config.student, sync, catalog)
}

/// Student manager plus agents; agents are only wired when the LLM is enabled
pub async fn create_tutor_service(config: &AppConfig) -> Result<TutorService> {
    let students = create_student_manager(config).await?;
    let tutor = TutorService::new(students);

    Ok(match create_llm_client(&config.llm)? {
        Some(llm) => tutor.with_llm(llm),
        None => tutor,
    })
}
