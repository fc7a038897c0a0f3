//! Learning objectives catalog
//!
//! Static, read-only mapping from cycle/theme/tier to objective entries. Loaded
//! once at startup and shared behind an `Arc`.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{ObjectiveEntry, ProficiencyLevel, StudentProfile};

/// Evaluations inspected for remedial recommendations
const REMEDIAL_WINDOW: usize = 5;

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    structure: BTreeMap<String, CycleData>,
}

#[derive(Deserialize)]
struct CycleData {
    #[serde(default)]
    themes: BTreeMap<String, ThemeData>,
}

#[derive(Deserialize)]
struct ThemeData {
    #[serde(default)]
    description: String,
    #[serde(default)]
    niveaux: BTreeMap<String, TierData>,
}

#[derive(Deserialize)]
struct TierData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    example_exercises: Vec<String>,
    #[serde(default)]
    example_functions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectivesCatalog {
    entries: HashMap<String, ObjectiveEntry>,
    order: Vec<String>,
}

impl ObjectivesCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read objectives catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded {} learning objectives from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse and flatten the nested catalog into `"{cycle}::{theme}::{tier}"` entries
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("Invalid objectives catalog: {}", e)))?;

        let mut catalog = Self::default();
        for (cycle, cycle_data) in file.structure {
            for (theme, theme_data) in cycle_data.themes {
                for (tier_key, tier_data) in theme_data.niveaux {
                    let tier: u8 = tier_key.trim().parse().map_err(|_| {
                        AppError::Config(format!(
                            "Tier '{}' of {}::{} is not a number",
                            tier_key, cycle, theme
                        ))
                    })?;
                    let id = ObjectiveEntry::make_id(&cycle, &theme, tier);
                    let entry = ObjectiveEntry {
                        id: id.clone(),
                        cycle: cycle.clone(),
                        theme: theme.clone(),
                        description: theme_data.description.clone(),
                        tier,
                        level_name: tier_data.name,
                        objectives: tier_data.objectives,
                        example_exercises: tier_data.example_exercises,
                        example_functions: tier_data.example_functions,
                    };
                    catalog.order.push(id.clone());
                    catalog.entries.insert(id, entry);
                }
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&ObjectiveEntry> {
        self.entries.get(id)
    }

    /// Ids in catalog order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn for_level(&self, level: ProficiencyLevel) -> impl Iterator<Item = &ObjectiveEntry> {
        let tier = level.tier();
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(move |entry| entry.tier == tier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Objectives worth targeting next; pure over the profile and the catalog
    ///
    /// - uncompleted catalog objectives at the profile's tier
    /// - the profile's own targeted objectives not yet completed
    /// - for each objective failed among the last few evaluations, the same
    ///   theme one tier lower, when it exists and is not completed
    pub fn recommend_objectives(&self, profile: &StudentProfile) -> BTreeSet<String> {
        let done = &profile.objectives_completed;

        let mut recommended: BTreeSet<String> = self
            .for_level(profile.level)
            .map(|entry| entry.id.clone())
            .filter(|id| !done.contains(id))
            .collect();

        recommended.extend(
            profile
                .learning_objectives
                .iter()
                .filter(|id| !done.contains(*id))
                .cloned(),
        );

        let remedial = profile
            .recent(REMEDIAL_WINDOW)
            .iter()
            .filter(|e| !e.is_correct)
            .filter_map(|e| e.objective.as_deref())
            .filter_map(|id| self.get(id))
            .filter_map(ObjectiveEntry::remedial_id)
            .filter(|id| self.entries.contains_key(id) && !done.contains(id));
        recommended.extend(remedial);

        recommended
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::EvaluationResult;

    pub(crate) const CATALOG: &str = r#"{
        "structure": {
            "lycee": {
                "themes": {
                    "fonctions": {
                        "description": "Study of functions",
                        "niveaux": {
                            "1": { "name": "Discovery", "objectives": ["Compute an image"], "example_functions": ["f(x) = 2x + 1"] },
                            "2": { "name": "Variations", "objectives": ["Study variations"], "example_functions": ["f(x) = x^2 - 4x"] },
                            "3": { "name": "Derivatives", "objectives": ["Differentiate"], "example_functions": ["f(x) = x^3"] }
                        }
                    },
                    "probabilites": {
                        "description": "Probability",
                        "niveaux": {
                            "1": { "name": "Events", "objectives": ["Count outcomes"] },
                            "2": { "name": "Conditional", "objectives": ["Use trees"] }
                        }
                    }
                }
            }
        }
    }"#;

    fn catalog() -> ObjectivesCatalog {
        ObjectivesCatalog::from_json_str(CATALOG).unwrap()
    }

    fn profile(level: ProficiencyLevel) -> StudentProfile {
        StudentProfile::new("s1", level).unwrap()
    }

    #[test]
    fn test_catalog_is_flattened_in_sorted_order() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.ids()[0], "lycee::fonctions::1");
        assert_eq!(catalog.ids()[4], "lycee::probabilites::2");

        let entry = catalog.get("lycee::fonctions::2").unwrap();
        assert_eq!(entry.level_name, "Variations");
        assert_eq!(entry.description, "Study of functions");
        assert_eq!(entry.tier, 2);
    }

    #[test]
    fn test_non_numeric_tier_is_rejected() {
        let json = r#"{"structure":{"c":{"themes":{"t":{"niveaux":{"easy":{}}}}}}}"#;
        assert!(matches!(
            ObjectivesCatalog::from_json_str(json),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        assert!(matches!(
            ObjectivesCatalog::load("/nonexistent/objectives.json"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_recommends_current_tier_minus_completed() {
        let catalog = catalog();
        let mut p = profile(ProficiencyLevel::Beginner);
        p.objectives_completed.insert("lycee::probabilites::1".into());

        let rec = catalog.recommend_objectives(&p);
        assert_eq!(
            rec.into_iter().collect::<Vec<_>>(),
            vec!["lycee::fonctions::1".to_string()]
        );
    }

    #[test]
    fn test_includes_targeted_objectives() {
        let catalog = catalog();
        let mut p = profile(ProficiencyLevel::Advanced);
        p.learning_objectives.insert("lycee::probabilites::2".into());

        let rec = catalog.recommend_objectives(&p);
        assert!(rec.contains("lycee::fonctions::3"));
        assert!(rec.contains("lycee::probabilites::2"));
    }

    #[test]
    fn test_recent_failure_adds_remedial_objective() {
        let catalog = catalog();
        let mut p = profile(ProficiencyLevel::Intermediate);
        p.record(
            EvaluationResult::new("ex1", "s1", false)
                .with_objective("lycee::fonctions::2")
                .with_error_category("sign-error"),
        );

        let rec = catalog.recommend_objectives(&p);
        assert!(rec.contains("lycee::fonctions::1"));
        assert!(!rec.contains("lycee::probabilites::1"));
    }

    #[test]
    fn test_recommendation_is_pure() {
        let catalog = catalog();
        let p = profile(ProficiencyLevel::Beginner);
        let before = p.clone();

        let first = catalog.recommend_objectives(&p);
        let second = catalog.recommend_objectives(&p);

        assert_eq!(first, second);
        assert_eq!(p, before);
    }
}
