//! Configuration management for patient-intake.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::patient::IntakeLimits;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "patient-intake";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "patients.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "PATIENT_INTAKE_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PATIENT_INTAKE_`, sections split by `__`)
/// 2. TOML config file at `~/.config/patient-intake/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Password hashing configuration.
    pub security: SecurityConfig,
    /// Password policy configuration.
    pub policy: PolicyConfig,
    /// Form field limits.
    pub intake: IntakeConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind_address: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/patient-intake/patients.db`
    pub database_path: Option<PathBuf>,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Memory cost in KiB.
    pub argon2_memory_kib: u32,
    /// Number of iterations.
    pub argon2_iterations: u32,
    /// Degree of parallelism.
    pub argon2_parallelism: u32,
}

/// Password policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Reject submissions whose password fails an enabled rule.
    pub enforce_rules: bool,
    /// Seed the built-in rule set when the database is created.
    pub seed_default_rules: bool,
}

/// Limits applied to submitted form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Largest accepted age in years.
    pub max_age: u16,
    /// Maximum length of single-line fields, in characters.
    pub max_field_length: usize,
    /// Maximum length of the address, in characters.
    pub max_address_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: argon2::Params::DEFAULT_M_COST,
            argon2_iterations: argon2::Params::DEFAULT_T_COST,
            argon2_parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enforce_rules: true,
            seed_default_rules: true,
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_age: 150,
            max_field_length: 255,
            max_address_length: 1_000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid bind_address: {}", self.server.bind_address),
            });
        }

        if let Err(e) = self.argon2_params() {
            return Err(Error::ConfigValidation {
                message: format!("invalid argon2 parameters: {e}"),
            });
        }

        if self.intake.max_field_length == 0 || self.intake.max_address_length == 0 {
            return Err(Error::ConfigValidation {
                message: "max_field_length and max_address_length must be greater than 0"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build Argon2 parameters from the security section.
    ///
    /// # Errors
    ///
    /// Returns an error if Argon2 rejects the cost combination.
    pub fn argon2_params(&self) -> std::result::Result<argon2::Params, argon2::Error> {
        argon2::Params::new(
            self.security.argon2_memory_kib,
            self.security.argon2_iterations,
            self.security.argon2_parallelism,
            None,
        )
    }

    /// Field limits for form validation.
    #[must_use]
    pub fn intake_limits(&self) -> IntakeLimits {
        IntakeLimits {
            max_age: self.intake.max_age,
            max_field_length: self.intake.max_field_length,
            max_address_length: self.intake.max_address_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert!(config.policy.enforce_rules);
        assert!(config.policy.seed_default_rules);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_default_intake_config() {
        let intake = IntakeConfig::default();

        assert_eq!(intake.max_age, 150);
        assert_eq!(intake.max_field_length, 255);
        assert_eq!(intake.max_address_length, 1_000);
    }

    #[test]
    fn test_default_security_config_is_valid_argon2() {
        let config = Config::default();
        assert!(config.argon2_params().is_ok());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "not an address".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bind_address"));
    }

    #[test]
    fn test_validate_invalid_argon2_params() {
        let mut config = Config::default();
        config.security.argon2_iterations = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("argon2"));
    }

    #[test]
    fn test_validate_zero_field_length() {
        let mut config = Config::default();
        config.intake.max_field_length = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_field_length"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("patients.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_intake_limits_follow_config() {
        let mut config = Config::default();
        config.intake.max_age = 120;

        let limits = config.intake_limits();
        assert_eq!(limits.max_age, 120);
        assert_eq!(limits.max_field_length, 255);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("patient-intake"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nbind_address = \"0.0.0.0:9000\"\n\n[policy]\nenforce_rules = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert!(!config.policy.enforce_rules);
        assert!(config.policy.seed_default_rules);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbind_address = \"nowhere\"\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_security_config_deserialize() {
        let json = r#"{"argon2_memory_kib": 64, "argon2_iterations": 1}"#;
        let security: SecurityConfig = serde_json::from_str(json).unwrap();
        assert_eq!(security.argon2_memory_kib, 64);
        assert_eq!(security.argon2_iterations, 1);
        assert_eq!(security.argon2_parallelism, argon2::Params::DEFAULT_P_COST);
    }
}
