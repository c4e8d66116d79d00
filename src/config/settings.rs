//! TOML-based configuration for snowmock.
//!
//! Supports a config file (snowmock.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [dbt]
//! project_name = "hc_dbt"
//! project_dir = "."
//! profiles_dir = "."
//! target = "DEV"
//! compile_mode = "session"   # or "per_model"
//!
//! [warehouse]
//! driver = "snowflake"
//! connection_string = "${SNOWFLAKE_CONNECTION_STRING}"
//!
//! [worker]
//! path = "./snowflake-worker"
//! timeout_seconds = 300      # omit to wait indefinitely
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub dbt: DbtSettings,
    pub warehouse: WarehouseSettings,
    pub worker: WorkerSettings,
}

/// When dbt compiles models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Compile the whole project once per run type at session start.
    #[default]
    Session,
    /// Compile `--select <model>` every time a model is run.
    PerModel,
}

/// dbt project configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DbtSettings {
    /// dbt executable.
    pub executable: String,

    /// Project name as used in manifest unique ids (`model.<project>.<name>`).
    pub project_name: String,

    /// Directory dbt is run from.
    pub project_dir: String,

    /// Value of `--profiles-dir`.
    pub profiles_dir: String,

    /// Value of `--target`.
    pub target: String,

    /// Manifest location, relative to `project_dir`.
    pub manifest_path: String,

    pub compile_mode: CompileMode,

    /// Extra arguments appended to every `dbt compile`.
    pub extra_args: Vec<String>,
}

impl Default for DbtSettings {
    fn default() -> Self {
        Self {
            executable: "dbt".to_string(),
            project_name: String::new(),
            project_dir: ".".to_string(),
            profiles_dir: ".".to_string(),
            target: "DEV".to_string(),
            manifest_path: "target/manifest.json".to_string(),
            compile_mode: CompileMode::Session,
            extra_args: Vec::new(),
        }
    }
}

/// Warehouse connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseSettings {
    /// Driver name understood by the worker.
    pub driver: String,

    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: String,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            driver: "snowflake".to_string(),
            connection_string: String::new(),
        }
    }
}

impl WarehouseSettings {
    /// Get the connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }
}

/// Worker process configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the worker binary.
    pub path: Option<String>,

    /// Extra command-line arguments for the worker.
    pub args: Vec<String>,

    /// Per-request timeout. `None` waits indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SNOWMOCK_CONFIG`
    /// 2. `./snowmock.toml`
    /// 3. `~/.config/snowmock/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SNOWMOCK_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("snowmock.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("snowmock").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check the settings needed to resolve models against a manifest.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.dbt.project_name.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "dbt.project_name is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the settings needed to spawn a worker warehouse.
    pub fn validate_warehouse(&self) -> Result<(), SettingsError> {
        if self.warehouse.connection_string.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "warehouse.connection_string is required".to_string(),
            ));
        }
        if self.worker_path().is_none() {
            return Err(SettingsError::InvalidConfig(
                "worker.path is not set and no worker binary was found".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the worker binary path.
    ///
    /// Returns the configured path, or searches common locations.
    pub fn worker_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.worker.path {
            let expanded = expand_env_vars(path).ok()?;
            return Some(PathBuf::from(expanded));
        }

        ["./snowflake-worker", "./worker/snowflake-worker"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
