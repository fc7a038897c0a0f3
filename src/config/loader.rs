use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `MATHCOACH_MEMORY__BACKEND=chroma`
const ENV_PREFIX: &str = "MATHCOACH_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the default path
    ///
    /// Sources, later ones win:
    /// 1. development defaults
    /// 2. ./mathcoach.toml
    /// 3. environment variables
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// Load configuration from a given file
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        match config.memory.backend.as_str() {
            "embedded" => {}
            "chroma" => {
                if config.memory.url.is_empty() {
                    return Err(ConfigValidationError::MissingMemoryUrl);
                }
                if config.memory.collection.is_empty() {
                    return Err(ConfigValidationError::MissingCollection);
                }
            }
            other => return Err(ConfigValidationError::UnknownBackend(other.to_string())),
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigValidationError::InvalidDimension);
        }

        if config.llm.enabled && config.llm.base_url.is_empty() {
            return Err(ConfigValidationError::MissingLlmUrl);
        }

        if config.objectives.catalog_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::InvalidPath(
                "objectives.catalog_path".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("Unknown memory backend: {0}")]
    UnknownBackend(String),

    #[error("Memory store URL is not configured")]
    MissingMemoryUrl,

    #[error("Memory collection name is not configured")]
    MissingCollection,

    #[error("Embedding dimension must be greater than 0")]
    InvalidDimension,

    #[error("LLM base URL is not configured")]
    MissingLlmUrl,

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    PathBuf::from("mathcoach.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProficiencyLevel;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::load_from("/nonexistent/mathcoach.toml").unwrap();
        assert_eq!(config.memory.backend, "embedded");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.student.default_level, ProficiencyLevel::Beginner);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[memory]
backend = "chroma"
url = "http://chroma:8000"

[student]
default_level = "intermediate"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(config.memory.backend, "chroma");
        assert_eq!(config.memory.url, "http://chroma:8000");
        assert_eq!(config.memory.collection, "student_profiles");
        assert_eq!(config.student.default_level, ProficiencyLevel::Intermediate);
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = AppConfig::development();
        config.memory.backend = "redis".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = AppConfig::development();
        config.embedding.dimension = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidDimension)
        ));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ConfigLoader::validate(&AppConfig::development()).is_ok());
        assert!(ConfigLoader::validate(&AppConfig::production()).is_ok());
    }
}
