use serde::{Deserialize, Serialize};

/// Motivational message from the personal coach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachMessage {
    pub motivation: String,
    pub strategy: String,
    pub tip: String,
    #[serde(default)]
    pub encouragement: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl CoachMessage {
    /// Message used when the coach backend is unavailable
    pub fn fallback() -> Self {
        Self {
            motivation: "Hang in there, every effort counts!".to_string(),
            strategy: "Break the problem down into smaller steps.".to_string(),
            tip: "Don't hesitate to ask for help when you are stuck.".to_string(),
            encouragement: vec![
                "You are capable of great things!".to_string(),
                "Perseverance is the key to success.".to_string(),
            ],
            next_steps: Vec::new(),
        }
    }
}
