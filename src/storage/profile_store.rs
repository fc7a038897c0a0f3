//! Profile store
//!
//! Authoritative process-local registry of student profiles keyed by
//! `student_id`. Optionally mirrors every profile to `{data_dir}/{student_id}.json`
//! so a restarted process can warm itself from disk. The mirror is best-effort:
//! failures are logged and never turn a `put` into an error.
//!
//! The store also keeps the pending-sync ledger: ids whose local copy has not
//! been confirmed in long-term memory. With a `data_dir` the ledger is written
//! to `{data_dir}/sync/pending.json`, so a Dirty profile is still Dirty after a
//! restart.
//!
//! No internal locking: mutation needs `&mut self`, so callers sharing a store
//! across tasks must wrap it themselves.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{StudentProfile, validate_student_id};

/// Ledger location, relative to `data_dir`; a subdirectory never collides with a snapshot
const PENDING_LEDGER: &str = "sync/pending.json";

/// Why a local profile still has to reach long-term memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMark {
    /// Local copy is newer than the stored one
    Modified,
    /// Created while long-term memory was unreachable; a stored profile may
    /// exist and must be reconciled before anything is written
    Unverified,
}

#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: HashMap<String, StudentProfile>,
    pending: BTreeMap<String, SyncMark>,
    data_dir: Option<PathBuf>,
}

impl ProfileStore {
    /// Purely in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store mirrored to `data_dir`, loading any snapshots already there
    ///
    /// Snapshot files that fail to parse are skipped with a warning.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut profiles = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_snapshot(&path) {
                Ok(profile) => {
                    profiles.insert(profile.student_id.clone(), profile);
                }
                Err(e) => tracing::warn!("Skipping unreadable snapshot {}: {}", path.display(), e),
            }
        }

        let mut pending = Self::read_ledger(&data_dir.join(PENDING_LEDGER));
        pending.retain(|id, _| profiles.contains_key(id));

        tracing::info!(
            "Profile store opened at {} with {} profiles ({} pending sync)",
            data_dir.display(),
            profiles.len(),
            pending.len()
        );

        Ok(Self {
            profiles,
            pending,
            data_dir: Some(data_dir),
        })
    }

    fn read_ledger(path: &Path) -> BTreeMap<String, SyncMark> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Cannot read pending-sync ledger {}: {}", path.display(), e);
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed pending-sync ledger {}: {}", path.display(), e);
            BTreeMap::new()
        })
    }

    fn write_ledger(&self) {
        let Some(dir) = &self.data_dir else {
            return;
        };
        let path = dir.join(PENDING_LEDGER);
        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .map_err(AppError::from)
            .and_then(|_| serde_json::to_string_pretty(&self.pending).map_err(AppError::from))
            .and_then(|json| std::fs::write(&path, json).map_err(AppError::from));
        if let Err(e) = result {
            tracing::warn!("Failed to write pending-sync ledger {}: {}", path.display(), e);
        }
    }

    fn read_snapshot(path: &Path) -> Result<StudentProfile> {
        let content = std::fs::read_to_string(path)?;
        let profile: StudentProfile = serde_json::from_str(&content)
            .map_err(|e| AppError::Deserialization(e.to_string()))?;
        validate_student_id(&profile.student_id)?;
        Ok(profile)
    }

    fn snapshot_path(&self, student_id: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", student_id)))
    }

    fn write_snapshot(&self, profile: &StudentProfile) {
        let Some(path) = self.snapshot_path(&profile.student_id) else {
            return;
        };
        let result = serde_json::to_string_pretty(profile)
            .map_err(AppError::from)
            .and_then(|json| std::fs::write(&path, json).map_err(AppError::from));
        if let Err(e) = result {
            tracing::warn!("Failed to write snapshot {}: {}", path.display(), e);
        }
    }

    /// Lookup without consulting long-term memory
    pub fn get(&self, student_id: &str) -> Result<&StudentProfile> {
        self.profiles
            .get(student_id)
            .ok_or_else(|| AppError::NotFound(format!("Student profile not found: {}", student_id)))
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.profiles.contains_key(student_id)
    }

    /// Insert or replace the whole profile (last writer wins)
    pub fn put(&mut self, profile: StudentProfile) -> Result<()> {
        validate_student_id(&profile.student_id)?;
        self.write_snapshot(&profile);
        self.profiles.insert(profile.student_id.clone(), profile);
        Ok(())
    }

    /// Snapshot of known ids
    pub fn list_ids(&self) -> BTreeSet<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Remove a profile; absent ids are a no-op
    pub fn remove(&mut self, student_id: &str) -> Option<StudentProfile> {
        let removed = self.profiles.remove(student_id);
        if let Some(path) = self.snapshot_path(student_id) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove snapshot {}: {}", path.display(), e);
                }
            }
        }
        if self.pending.remove(student_id).is_some() {
            self.write_ledger();
        }
        removed
    }

    pub fn sync_mark(&self, student_id: &str) -> Option<SyncMark> {
        self.pending.get(student_id).copied()
    }

    /// Record that a profile awaits sync; an `Unverified` mark is never downgraded here
    pub fn mark_pending(&mut self, student_id: &str, mark: SyncMark) {
        let current = self.pending.get(student_id).copied();
        if current.is_some_and(|c| c >= mark) {
            return;
        }
        self.pending.insert(student_id.to_string(), mark);
        self.write_ledger();
    }

    /// The local copy now includes what long-term memory held
    pub fn mark_verified(&mut self, student_id: &str) {
        if self.sync_mark(student_id) == Some(SyncMark::Unverified) {
            self.pending.insert(student_id.to_string(), SyncMark::Modified);
            self.write_ledger();
        }
    }

    pub fn clear_pending(&mut self, student_id: &str) {
        if self.pending.remove(student_id).is_some() {
            self.write_ledger();
        }
    }

    pub fn pending_ids(&self) -> BTreeSet<String> {
        self.pending.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProficiencyLevel;

    fn profile(id: &str) -> StudentProfile {
        StudentProfile::new(id, ProficiencyLevel::Beginner).unwrap()
    }

    #[test]
    fn test_put_get_overwrite() {
        let mut store = ProfileStore::new();
        store.put(profile("s1")).unwrap();

        let mut updated = profile("s1");
        updated.level = ProficiencyLevel::Advanced;
        store.put(updated).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().level, ProficiencyLevel::Advanced);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = ProfileStore::new();
        assert!(matches!(store.get("nobody"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_put_rejects_blank_id() {
        let mut store = ProfileStore::new();
        let mut bad = profile("s1");
        bad.student_id = String::new();
        assert!(matches!(store.put(bad), Err(AppError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = ProfileStore::new();
        store.put(profile("s1")).unwrap();

        assert!(store.remove("s1").is_some());
        assert!(store.remove("s1").is_none());
        assert!(matches!(store.get("s1"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_ids_snapshot() {
        let mut store = ProfileStore::new();
        store.put(profile("b")).unwrap();
        store.put(profile("a")).unwrap();

        let ids: Vec<_> = store.list_ids().into_iter().collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = ProfileStore::open(dir.path()).unwrap();
            store.put(profile("s1").with_name("Alice")).unwrap();
            store.put(profile("s2")).unwrap();
            store.remove("s2");
        }

        let store = ProfileStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_pending_marks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = ProfileStore::open(dir.path()).unwrap();
            store.put(profile("s1")).unwrap();
            store.put(profile("s2")).unwrap();
            store.put(profile("s3")).unwrap();
            store.mark_pending("s1", SyncMark::Modified);
            store.mark_pending("s2", SyncMark::Unverified);
            store.mark_pending("s3", SyncMark::Modified);
            store.clear_pending("s3");
        }

        let store = ProfileStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.sync_mark("s1"), Some(SyncMark::Modified));
        assert_eq!(store.sync_mark("s2"), Some(SyncMark::Unverified));
        assert_eq!(store.sync_mark("s3"), None);
        assert_eq!(
            store.pending_ids().into_iter().collect::<Vec<_>>(),
            vec!["s1".to_string(), "s2".to_string()]
        );
    }

    #[test]
    fn test_unverified_mark_is_not_downgraded() {
        let mut store = ProfileStore::new();
        store.put(profile("s1")).unwrap();

        store.mark_pending("s1", SyncMark::Unverified);
        store.mark_pending("s1", SyncMark::Modified);
        assert_eq!(store.sync_mark("s1"), Some(SyncMark::Unverified));

        store.mark_verified("s1");
        assert_eq!(store.sync_mark("s1"), Some(SyncMark::Modified));
    }

    #[test]
    fn test_remove_clears_pending_mark() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::open(dir.path()).unwrap();
        store.put(profile("s1")).unwrap();
        store.mark_pending("s1", SyncMark::Modified);
        store.remove("s1");

        let store = ProfileStore::open(dir.path()).unwrap();
        assert!(store.pending_ids().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = ProfileStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }
}
