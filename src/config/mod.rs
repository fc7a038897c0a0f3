//! Configuration
//!
//! Loads application configuration from a TOML file with environment variable overrides.

pub mod config;
pub mod loader;

pub use config::AppConfig;
pub use loader::ConfigLoader;
