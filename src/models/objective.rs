//! Learning objective catalog entries

use serde::{Deserialize, Serialize};

/// One flattened catalog entry: a theme at a given tier inside a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveEntry {
    /// `"{cycle}::{theme}::{tier}"`
    pub id: String,
    pub cycle: String,
    pub theme: String,
    /// Theme description
    pub description: String,
    /// Catalog tier, 1 = beginner
    pub tier: u8,
    /// Human-readable tier name
    pub level_name: String,
    /// Skills expected at this tier
    pub objectives: Vec<String>,
    pub example_exercises: Vec<String>,
    pub example_functions: Vec<String>,
}

impl ObjectiveEntry {
    pub fn make_id(cycle: &str, theme: &str, tier: u8) -> String {
        format!("{}::{}::{}", cycle, theme, tier)
    }

    /// Same cycle and theme one tier lower
    pub fn remedial_id(&self) -> Option<String> {
        (self.tier > 1).then(|| Self::make_id(&self.cycle, &self.theme, self.tier - 1))
    }
}
