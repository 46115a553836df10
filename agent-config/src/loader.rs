//! Layered loading: serialised defaults, then an optional JSON file, then
//! `SWARM_*` environment variables, with `__` separating nested keys
//! (`SWARM_SOURCE__PAGE_SIZE` sets `source.page_size`).

use std::path::Path;

use agent_adapters::gemini::GEMINI_API_KEY_ENV;
use config::{Config, Environment, File, FileFormat, Map};
use thiserror::Error;
use tracing::debug;

use crate::schema::HostConfig;

/// Prefix of every host environment override.
pub const ENV_PREFIX: &str = "SWARM";

/// Separator between nested keys in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read, parsed, or deserialised.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// A value is out of range.
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl HostConfig {
    /// Loads defaults, overlays `path` when given, then the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a layer cannot be read or deserialised, or
    /// when any resulting value is invalid.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading environment variables from `env`
    /// instead of the process environment when it is given.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> ConfigResult<Self> {
        let api_key = match &env {
            Some(vars) => vars.get(GEMINI_API_KEY_ENV).cloned(),
            None => std::env::var(GEMINI_API_KEY_ENV).ok(),
        }
        .filter(|key| !key.trim().is_empty());

        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
        }
        let builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .set_override_option("generation.api_key", api_key)?;

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(path = ?path, "configuration loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.source.page_size == 0 {
            return Err(ConfigError::invalid("source.page_size", "must be at least 1"));
        }
        if self.execution.max_concurrency == 0 {
            return Err(ConfigError::invalid("execution.max_concurrency", "must be at least 1"));
        }
        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::invalid(
                "generation.temperature",
                format!("{} is outside [0, 2]", generation.temperature),
            ));
        }
        if generation.max_output_tokens == 0 {
            return Err(ConfigError::invalid("generation.max_output_tokens", "must be at least 1"));
        }
        if generation.invocation_timeout_secs == 0 {
            return Err(ConfigError::invalid("generation.invocation_timeout_secs", "must be at least 1"));
        }
        if generation.default_model.trim().is_empty() {
            return Err(ConfigError::invalid("generation.default_model", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_validator::ValidatorConfig;
    use std::path::PathBuf;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect())
    }

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("swarm-config-{}-{}.json", std::process::id(), contents.len()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_survive_the_layering() {
        let config = HostConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.server.name, "ASM-Swarm-Host");
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.generation.default_model, crate::DEFAULT_MODEL);
        assert_eq!(config.execution.max_concurrency, 32);
        assert_eq!(config.validation, ValidatorConfig::default());
        assert_eq!(config.telemetry.filter, "info");
    }

    #[test]
    fn file_overrides_only_named_keys() {
        let path = temp_file(r#"{"source": {"page_size": 5}, "generation": {"temperature": 0.5}}"#);
        let config = HostConfig::load_with_env(Some(&path), env(&[])).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.source.page_size, 5);
        assert_eq!(config.source.contracts_path, PathBuf::from("contracts.json"));
        assert!((config.generation.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.generation.max_output_tokens, 2048);
    }

    #[test]
    fn unknown_keys_are_load_errors() {
        let path = temp_file(r#"{"sauce": {}}"#);
        let err = HostConfig::load_with_env(Some(&path), env(&[])).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = HostConfig::load_with_env(Some(Path::new("/nonexistent/swarm.json")), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn environment_wins_over_file_values() {
        let path = temp_file(r#"{"source": {"page_size": 5, "contracts_path": "file.json"}}"#);
        let config = HostConfig::load_with_env(
            Some(&path),
            env(&[
                ("SWARM_SOURCE__CONTRACTS_PATH", "/srv/contracts.json"),
                ("SWARM_SOURCE__PAGE_SIZE", "25"),
                ("SWARM_GENERATION__DEFAULT_MODEL", "gemini-1.5-flash"),
                ("SWARM_EXECUTION__MAX_CONCURRENCY", "4"),
                ("SWARM_TELEMETRY__FILTER", "debug"),
                ("GEMINI_API_KEY", "secret"),
            ]),
        )
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.source.contracts_path, PathBuf::from("/srv/contracts.json"));
        assert_eq!(config.source.page_size, 25);
        assert_eq!(config.generation.default_model, "gemini-1.5-flash");
        assert_eq!(config.execution.max_concurrency, 4);
        assert_eq!(config.telemetry.filter, "debug");
        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
        assert!(!format!("{:?}", config.generation).contains("secret"));
    }

    #[test]
    fn unparseable_override_is_a_load_error() {
        let err = HostConfig::load_with_env(None, env(&[("SWARM_SOURCE__PAGE_SIZE", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn out_of_range_override_is_invalid() {
        let err = HostConfig::load_with_env(None, env(&[("SWARM_EXECUTION__MAX_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "execution.max_concurrency"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = HostConfig::default();
        config.generation.temperature = 2.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = HostConfig::default();
        config.generation.invocation_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
