//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate:
//! 0. Loads a `.env` file if present (via dotenvy)
//! 1. Starts from the preset for the detected environment
//! 2. Layers an optional TOML file (explicit path or `FITDATA_CONFIG_PATH`)
//! 3. Applies `FITDATA__SECTION__FIELD` environment overrides
//! 4. Validates the result, failing fast on a missing backend URL

use super::DataLayerConfig;
use crate::error::{DataError, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

const ENV_PREFIX: &str = "FITDATA";
const CONFIG_PATH_VAR: &str = "FITDATA_CONFIG_PATH";

/// Builder-style configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    environment: Option<String>,
    env_source: Option<HashMap<String, String>>,
    skip_dotenv: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from an explicit TOML file instead of `FITDATA_CONFIG_PATH`
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use an explicit environment instead of detecting it
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Read overrides from the given map instead of the process environment.
    /// Useful for testing without modifying global environment variables.
    pub fn with_env_source(mut self, source: HashMap<String, String>) -> Self {
        self.env_source = Some(source);
        self.skip_dotenv = true;
        self
    }

    pub fn load(self) -> Result<DataLayerConfig> {
        if !self.skip_dotenv {
            if let Ok(path) = dotenvy::dotenv() {
                debug!(path = %path.display(), "Loaded .env file");
            }
        }

        let environment = self.environment.clone().unwrap_or_else(detect_environment);
        let defaults = preset_for(&environment);

        let defaults_source = Config::try_from(&defaults).map_err(config_error)?;
        let mut builder = Config::builder().add_source(defaults_source);

        let path = self
            .path
            .clone()
            .or_else(|| env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));
        if let Some(path) = &path {
            info!(path = %path.display(), environment = %environment, "Loading data layer configuration file");
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(self.env_source),
        );

        let mut config: DataLayerConfig = builder
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(config_error)?;

        if config.environment.is_empty() {
            config.environment = environment;
        }

        config.validate()?;
        config.log_configuration();
        Ok(config)
    }
}

fn config_error(error: config::ConfigError) -> DataError {
    DataError::configuration(error.to_string())
}

fn preset_for(environment: &str) -> DataLayerConfig {
    let url = env::var("DATABASE_URL").unwrap_or_default();
    match environment {
        "test" => DataLayerConfig::for_test(url),
        "development" => DataLayerConfig::for_development(url),
        other => DataLayerConfig {
            environment: other.to_string(),
            ..DataLayerConfig::default()
        },
    }
}

/// Detect the running environment from common environment variables
pub fn detect_environment() -> String {
    env::var("FITDATA_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .or_else(|_| env::var("RUST_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_toml_file_over_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "postgresql://fit:pw@localhost/fitness_test"

[database.pool]
max_connections = 7
min_connections = 3

[cache]
backend = "memory"

[cache.ttl]
exercises_seconds = 120
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_environment("production")
            .with_env_source(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(config.environment, "production");
        assert_eq!(config.database.pool.max_connections, 7);
        assert_eq!(config.database.pool.min_connections, 3);
        // untouched fields keep the preset value
        assert_eq!(config.database.pool.acquire_timeout_ms, 30_000);
        assert_eq!(config.cache.backend, "memory");
        assert_eq!(config.cache.ttl.exercises_seconds, 120);
        assert_eq!(config.cache.ttl.meals_seconds, 86_400);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let config = ConfigLoader::new()
            .with_environment("test")
            .with_env_source(env_map(&[
                ("FITDATA__DATABASE__URL", "postgresql://localhost/override"),
                ("FITDATA__DATABASE__POOL__MAX_CONNECTIONS", "12"),
            ]))
            .load()
            .unwrap();

        assert_eq!(config.database.url, "postgresql://localhost/override");
        assert_eq!(config.database.pool.max_connections, 12);
        assert_eq!(config.cache.backend, "memory");
    }

    #[test]
    fn missing_url_fails_fast() {
        let result = ConfigLoader::new()
            .with_environment("test")
            .with_env_source(env_map(&[("FITDATA__DATABASE__URL", "")]))
            .load();

        assert!(matches!(result, Err(DataError::Configuration(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/fitdata.toml")
            .with_environment("test")
            .with_env_source(env_map(&[(
                "FITDATA__DATABASE__URL",
                "postgresql://localhost/fitness",
            )]))
            .load();

        assert!(matches!(result, Err(DataError::Configuration(_))));
    }
}
