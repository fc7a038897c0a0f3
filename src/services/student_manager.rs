//! Student Manager Service
//!
//! Single entry point for reading and mutating student profiles. Keeps the
//! process-local `ProfileStore` and the long-term memory consistent:
//! - lookups go to the profile store first, then rehydrate from long-term memory
//! - every mutation lands in the profile store before it is written through
//! - a failed write-through leaves the profile **Dirty** until `flush` succeeds
//!
//! Availability wins over strict consistency: an unreachable store never
//! blocks reads or loses a local mutation. Pending marks live in the profile
//! store's ledger, so Dirty profiles stay Dirty across restarts. A profile
//! created while the store was unreachable is marked unverified and is
//! reconciled with the stored copy before its first write.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::config::StudentConfig;
use crate::error::{AppError, Result};
use crate::models::{EvaluationResult, ProficiencyLevel, StudentProfile, validate_student_id};
use crate::observability::SyncMetrics;
use crate::services::memory_sync::MemorySync;
use crate::services::objectives::ObjectivesCatalog;
use crate::storage::{BackupWriter, ProfileStore, SyncMark};

/// Consistency state of one student id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not present locally
    Unknown,
    /// Present locally and believed identical to long-term memory
    Cached,
    /// Local mutation not yet confirmed in long-term memory
    Dirty,
}

/// Result of a mutation
///
/// The local profile is always updated; `error` carries the persistence
/// failure, if any, that left it Dirty.
#[derive(Debug)]
#[must_use]
pub struct WriteOutcome {
    pub profile: StudentProfile,
    pub state: SyncState,
    pub error: Option<AppError>,
}

impl WriteOutcome {
    pub fn is_synced(&self) -> bool {
        self.error.is_none() && self.state == SyncState::Cached
    }

    /// Surface a pending persistence failure as an error ("saved locally, sync pending")
    pub fn into_result(self) -> Result<StudentProfile> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.profile),
        }
    }
}

/// Outcome of flushing every dirty profile
#[derive(Debug, Default)]
pub struct FlushReport {
    pub flushed: Vec<String>,
    pub failed: Vec<(String, AppError)>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct StudentManager {
    store: ProfileStore,
    sync: MemorySync,
    catalog: Arc<ObjectivesCatalog>,
    backups: Option<BackupWriter>,
    default_level: ProficiencyLevel,
    metrics: SyncMetrics,
}

impl StudentManager {
    pub fn new(store: ProfileStore, sync: MemorySync, catalog: Arc<ObjectivesCatalog>) -> Self {
        Self {
            store,
            sync,
            catalog,
            backups: None,
            default_level: ProficiencyLevel::default(),
            metrics: SyncMetrics::default(),
        }
    }

    /// Build from configuration; opens the on-disk profile mirror when `data_dir` is set
    pub fn from_config(
        config: &StudentConfig,
        sync: MemorySync,
        catalog: Arc<ObjectivesCatalog>,
    ) -> Result<Self> {
        let store = match &config.data_dir {
            Some(dir) => ProfileStore::open(dir)?,
            None => ProfileStore::new(),
        };

        let mut manager = Self::new(store, sync, catalog).with_default_level(config.default_level);
        if let (Some(dir), true) = (&config.data_dir, config.backups_enabled) {
            manager = manager.with_backups(BackupWriter::new(dir));
        }
        Ok(manager)
    }

    pub fn with_backups(mut self, backups: BackupWriter) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn with_default_level(mut self, level: ProficiencyLevel) -> Self {
        self.default_level = level;
        self
    }

    pub fn default_level(&self) -> ProficiencyLevel {
        self.default_level
    }

    pub fn catalog(&self) -> &ObjectivesCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Local lookup only
    pub fn get(&self, student_id: &str) -> Result<&StudentProfile> {
        self.store.get(student_id)
    }

    pub fn list_ids(&self) -> BTreeSet<String> {
        self.store.list_ids()
    }

    pub fn dirty_ids(&self) -> BTreeSet<String> {
        self.store.pending_ids()
    }

    pub fn state(&self, student_id: &str) -> SyncState {
        if self.store.sync_mark(student_id).is_some() {
            SyncState::Dirty
        } else if self.store.contains(student_id) {
            SyncState::Cached
        } else {
            SyncState::Unknown
        }
    }

    /// Return the local profile, rehydrate it from long-term memory, or create it
    ///
    /// Only fails for a malformed id. When long-term memory is unreachable or
    /// holds a corrupt record, a fresh local profile is returned; its state
    /// tells whether the write-through succeeded.
    pub async fn get_or_create(
        &mut self,
        student_id: &str,
        default_level: ProficiencyLevel,
    ) -> Result<StudentProfile> {
        validate_student_id(student_id)?;

        if let Ok(profile) = self.store.get(student_id) {
            return Ok(profile.clone());
        }

        match self.sync.fetch(student_id).await {
            Ok(profile) => {
                tracing::info!("Rehydrated profile {} from long-term memory", student_id);
                self.store.put(profile.clone())?;
                self.store.clear_pending(student_id);
                return Ok(profile);
            }
            Err(AppError::NotFound(_)) => {
                self.metrics.record_fetch_miss();
                tracing::debug!("No stored profile for {}, creating one", student_id);
            }
            Err(e @ AppError::Deserialization(_)) => {
                self.metrics.record_corrupt_record();
                tracing::warn!(
                    "Corrupt long-term record for {}, replacing with a new profile: {}",
                    student_id,
                    e
                );
            }
            Err(e) => {
                // The stored profile may still exist; it is fetched and merged before any write.
                tracing::warn!(
                    "Long-term memory unavailable while loading {}, continuing locally: {}",
                    student_id,
                    e
                );
                let profile = StudentProfile::new(student_id, default_level)?;
                self.store.put(profile.clone())?;
                self.store.mark_pending(student_id, SyncMark::Unverified);
                self.backup(&profile, &e);
                return Ok(profile);
            }
        }

        let profile = StudentProfile::new(student_id, default_level)?;
        self.store.put(profile.clone())?;
        tracing::info!("Created profile {} at level {}", student_id, default_level);

        let outcome = self.write_through(profile).await;
        Ok(outcome.profile)
    }

    /// Create a student with a generated id and the manager's default level
    ///
    /// Generated ids carry a random suffix, so they are unique across
    /// processes sharing one long-term memory, not only within this store.
    pub async fn create_student(&mut self, name: Option<&str>) -> Result<WriteOutcome> {
        let mut student_id = StudentProfile::generate_id();
        while self.store.contains(&student_id) {
            student_id = StudentProfile::generate_id();
        }

        let mut profile = StudentProfile::new(&student_id, self.default_level)?;
        profile.name = name.map(str::to_string);
        profile.last_session = Some(profile.created_at);
        self.store.put(profile.clone())?;
        tracing::info!("Created student {} ({})", student_id, name.unwrap_or("anonymous"));

        Ok(self.write_through(profile).await)
    }

    /// Apply a mutation to the local profile, then write it through
    ///
    /// `NotFound` if the profile is not loaded. A mutation that changes the
    /// student id is rejected and nothing is applied.
    pub async fn update<F>(&mut self, student_id: &str, mutate: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut StudentProfile),
    {
        validate_student_id(student_id)?;
        let mut profile = self.store.get(student_id)?.clone();
        mutate(&mut profile);

        if profile.student_id != student_id {
            return Err(AppError::Validation(format!(
                "student_id is immutable (tried to change {} to {})",
                student_id, profile.student_id
            )));
        }

        self.store.put(profile.clone())?;
        Ok(self.write_through(profile).await)
    }

    /// Append an evaluation to the student's history
    ///
    /// An evaluation with the same exercise id and timestamp as one already in
    /// the history is ignored.
    pub async fn record_evaluation(
        &mut self,
        student_id: &str,
        evaluation: EvaluationResult,
    ) -> Result<WriteOutcome> {
        validate_student_id(student_id)?;
        if evaluation.student_id != student_id {
            return Err(AppError::Validation(format!(
                "Evaluation for {} cannot be recorded on {}",
                evaluation.student_id, student_id
            )));
        }

        let profile = self.store.get(student_id)?;
        if profile.has_evaluation(&evaluation) {
            tracing::debug!(
                "Ignoring duplicate evaluation of exercise {} for {}",
                evaluation.exercise_id,
                student_id
            );
            return Ok(WriteOutcome {
                profile: profile.clone(),
                state: self.state(student_id),
                error: None,
            });
        }

        tracing::info!(
            "Recording evaluation of exercise {} for {} (correct: {})",
            evaluation.exercise_id,
            student_id,
            evaluation.is_correct
        );
        self.update(student_id, |p| p.record(evaluation)).await
    }

    pub async fn set_level(
        &mut self,
        student_id: &str,
        level: ProficiencyLevel,
    ) -> Result<WriteOutcome> {
        self.update(student_id, |p| p.level = level).await
    }

    /// Point the student at an objective; it must exist in the catalog
    pub async fn set_current_objective(
        &mut self,
        student_id: &str,
        objective_id: Option<&str>,
    ) -> Result<WriteOutcome> {
        if let Some(id) = objective_id {
            self.ensure_objective(id)?;
        }
        let objective = objective_id.map(str::to_string);
        self.update(student_id, |p| {
            if let Some(id) = &objective {
                p.learning_objectives.insert(id.clone());
            }
            p.current_objective = objective;
        })
        .await
    }

    pub async fn target_objective(
        &mut self,
        student_id: &str,
        objective_id: &str,
    ) -> Result<WriteOutcome> {
        self.ensure_objective(objective_id)?;
        let objective = objective_id.to_string();
        self.update(student_id, |p| {
            p.learning_objectives.insert(objective);
        })
        .await
    }

    /// Mark an objective as mastered
    ///
    /// Completing the last catalog objective of the student's tier promotes
    /// them to the next level.
    pub async fn complete_objective(
        &mut self,
        student_id: &str,
        objective_id: &str,
    ) -> Result<WriteOutcome> {
        self.ensure_objective(objective_id)?;
        let catalog = Arc::clone(&self.catalog);
        self.update(student_id, |p| {
            p.complete_objective(objective_id);
            let mut tier = catalog.for_level(p.level).peekable();
            let finished = tier.peek().is_some()
                && tier.all(|entry| p.objectives_completed.contains(&entry.id));
            if finished && p.level != p.level.next() {
                tracing::info!(
                    "{} finished tier {}, promoting to {}",
                    p.student_id,
                    p.level,
                    p.level.next()
                );
                p.level = p.level.next();
            }
        })
        .await
    }

    fn ensure_objective(&self, objective_id: &str) -> Result<()> {
        if self.catalog.get(objective_id).is_none() {
            return Err(AppError::Validation(format!(
                "Unknown objective: {}",
                objective_id
            )));
        }
        Ok(())
    }

    /// Retry the write-through of a Dirty profile
    ///
    /// No-op for profiles that are not Dirty. On failure the profile stays
    /// Dirty and the persistence error is returned.
    pub async fn flush(&mut self, student_id: &str) -> Result<()> {
        validate_student_id(student_id)?;
        if self.store.sync_mark(student_id).is_none() {
            return Ok(());
        }

        self.metrics.record_flush();
        match self.push(student_id).await {
            Ok(_) => {
                tracing::info!("Flushed profile {} to long-term memory", student_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Flush of {} failed, still dirty: {}", student_id, e);
                Err(e)
            }
        }
    }

    /// Flush every Dirty profile, collecting failures instead of stopping at the first
    pub async fn flush_all(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        for student_id in self.dirty_ids() {
            match self.flush(&student_id).await {
                Ok(()) => report.flushed.push(student_id),
                Err(e) => report.failed.push((student_id, e)),
            }
        }
        report
    }

    /// Drop the profile locally and delete it from long-term memory (best-effort)
    pub async fn remove(&mut self, student_id: &str) -> Result<()> {
        validate_student_id(student_id)?;

        if self.store.remove(student_id).is_some() {
            tracing::info!("Removed profile {}", student_id);
        }

        if let Err(e) = self.sync.delete(student_id).await {
            tracing::warn!(
                "Could not delete {} from long-term memory: {}",
                student_id,
                e
            );
        }
        Ok(())
    }

    /// Objectives to target next, derived from the profile and the catalog
    pub fn recommend_objectives(&self, student_id: &str) -> Result<BTreeSet<String>> {
        let profile = self.store.get(student_id)?;
        Ok(self.catalog.recommend_objectives(profile))
    }

    /// Semantic lookup of students in long-term memory
    pub async fn search(&self, query_text: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        self.metrics.record_search();
        self.sync.search(query_text, top_k).await
    }

    /// Mark the local profile pending, then write it through
    ///
    /// The mark is recorded first, so a crash mid-write still leaves the
    /// profile Dirty on the next start.
    async fn write_through(&mut self, profile: StudentProfile) -> WriteOutcome {
        let student_id = profile.student_id.clone();
        self.store.mark_pending(&student_id, SyncMark::Modified);

        match self.push(&student_id).await {
            Ok(profile) => WriteOutcome {
                profile,
                state: SyncState::Cached,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Profile {} saved locally, sync pending: {}", student_id, e);
                let profile = self.store.get(&student_id).cloned().unwrap_or(profile);
                self.backup(&profile, &e);
                WriteOutcome {
                    profile,
                    state: SyncState::Dirty,
                    error: Some(e),
                }
            }
        }
    }

    /// Persist the local profile and clear its pending mark
    ///
    /// An unverified profile is first merged with whatever long-term memory
    /// holds, so a blank profile created offline never overwrites real data.
    async fn push(&mut self, student_id: &str) -> Result<StudentProfile> {
        if self.store.sync_mark(student_id) == Some(SyncMark::Unverified) {
            self.verify(student_id).await?;
        }

        let profile = self.store.get(student_id)?.clone();
        match self.sync.persist(&profile).await {
            Ok(()) => {
                self.metrics.record_persist(true);
                self.store.clear_pending(student_id);
                Ok(profile)
            }
            Err(e) => {
                self.metrics.record_persist(false);
                Err(e)
            }
        }
    }

    async fn verify(&mut self, student_id: &str) -> Result<()> {
        match self.sync.fetch(student_id).await {
            Ok(stored) => {
                let local = self.store.get(student_id)?.clone();
                tracing::info!(
                    "Reconciling offline copy of {} with long-term memory ({} stored evaluations)",
                    student_id,
                    stored.history.len()
                );
                self.store.put(stored.reconcile(local))?;
            }
            Err(AppError::NotFound(_)) => {
                self.metrics.record_fetch_miss();
            }
            Err(e @ AppError::Deserialization(_)) => {
                self.metrics.record_corrupt_record();
                tracing::warn!(
                    "Corrupt long-term record for {}, local copy will replace it: {}",
                    student_id,
                    e
                );
            }
            Err(e) => {
                self.metrics.record_persist(false);
                return Err(AppError::Persistence(format!(
                    "Cannot verify stored profile {} before writing: {}",
                    student_id, e
                )));
            }
        }
        self.store.mark_verified(student_id);
        Ok(())
    }

    fn backup(&self, profile: &StudentProfile, error: &AppError) {
        let Some(backups) = &self.backups else {
            return;
        };
        match backups.write(profile, error) {
            Ok(path) => tracing::info!("Sync backup written to {}", path.display()),
            Err(e) => tracing::error!(
                "Failed to write sync backup for {}: {}",
                profile.student_id,
                e
            ),
        }
    }
}
