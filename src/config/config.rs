use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::ProficiencyLevel;

/// Long-term memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemoryConfig {
    /// Backend type: "embedded" or "chroma"
    pub backend: String,
    /// Chroma server address
    pub url: String,
    /// Collection holding student profiles
    pub collection: String,
    /// Request timeout (seconds)
    pub timeout: u64,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name
    pub model_name: String,
    /// Embedding backend: "hashed" or "ollama"
    pub backend: String,
    /// Vector dimension
    pub dimension: usize,
    /// Ollama server address
    pub ollama_url: String,
    /// Ollama request timeout (seconds)
    pub ollama_timeout: u64,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Whether agents call the model at all; fallbacks are used otherwise
    pub enabled: bool,
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// Request timeout (seconds)
    pub timeout: u64,
}

/// Student profile handling
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudentConfig {
    /// Local directory for profile snapshots and sync backups
    pub data_dir: Option<PathBuf>,
    /// Level given to newly created profiles
    pub default_level: ProficiencyLevel,
    /// Write a backup file whenever a sync to long-term memory fails
    pub backups_enabled: bool,
}

/// Learning objectives catalog
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ObjectivesConfig {
    /// Path of the catalog JSON file
    pub catalog_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Structured (JSON) output
    pub structured: bool,
    /// Log file directory
    pub log_dir: Option<PathBuf>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub memory: MemoryConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub student: StudentConfig,
    pub objectives: ObjectivesConfig,
    pub logging: LoggingConfig,
    /// Application name
    pub app_name: String,
    /// Environment
    pub environment: String,
}

impl AppConfig {
    /// Development configuration
    pub fn development() -> Self {
        Self {
            memory: MemoryConfig {
                backend: "embedded".into(),
                url: "http://localhost:8000".into(),
                collection: "student_profiles".into(),
                timeout: 30,
            },
            embedding: EmbeddingConfig {
                model_name: "nomic-embed-text".into(),
                backend: "hashed".into(),
                dimension: 384,
                ollama_url: "http://localhost:11434".into(),
                ollama_timeout: 60,
            },
            llm: LlmConfig {
                enabled: false,
                base_url: "https://api.groq.com/openai/v1".into(),
                model: "llama-3.3-70b-versatile".into(),
                api_key_env: "GROQ_API_KEY".into(),
                temperature: 0.7,
                max_tokens: 2048,
                timeout: 60,
            },
            student: StudentConfig {
                data_dir: Some(PathBuf::from("./students_data")),
                default_level: ProficiencyLevel::Beginner,
                backups_enabled: true,
            },
            objectives: ObjectivesConfig {
                catalog_path: PathBuf::from("./data/objectives.json"),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "mathcoach".into(),
            environment: "development".into(),
        }
    }

    /// Production configuration
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config.memory.backend = "chroma".into();
        config.llm.enabled = true;
        config
    }
}
