//! Configuration loading via `ortho-config`.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::client::TaskPolicy;

/// Connection settings for one DME backend, merged from defaults,
/// configuration files, and `DME_*` environment variables.
#[derive(Clone, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "DME",
    discovery(
        app_name = "dme-aseries",
        env_var = "DME_CONFIG_PATH",
        config_file_name = "dme.toml",
        dotfile_name = ".dme.toml",
        project_file_name = "dme.toml"
    )
)]
pub struct DmeConfig {
    /// Logical backend identifier used in logs and credential lookups.
    #[ortho_config(default = "dme-aseries".to_owned())]
    pub backend_id: String,
    /// Comma-separated candidate management URLs, tried in order.
    #[ortho_config(default = String::new())]
    pub urls: String,
    /// Login user name.
    #[ortho_config(default = String::new())]
    pub user: String,
    /// Login password.
    #[ortho_config(default = String::new())]
    pub password: String,
    /// Concurrent requests allowed for this backend, clamped to `[1, 30]`.
    #[ortho_config(default = 5)]
    pub parallel_num: u32,
    /// Accept any server certificate. Only for lab arrays with self-signed
    /// certificates.
    #[ortho_config(default = false)]
    pub insecure_skip_verify: bool,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
    /// First delay between task polls, in milliseconds.
    #[ortho_config(default = 2000)]
    pub task_initial_interval_ms: u64,
    /// Longest delay between task polls, in milliseconds.
    #[ortho_config(default = 30000)]
    pub task_max_interval_ms: u64,
    /// Total time to wait for a task, in seconds.
    #[ortho_config(default = 1200)]
    pub task_timeout_secs: u64,
}

impl fmt::Debug for DmeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmeConfig")
            .field("backend_id", &self.backend_id)
            .field("urls", &self.urls)
            .field("user", &self.user)
            .field("password", &"***")
            .field("parallel_num", &self.parallel_num)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("task_initial_interval_ms", &self.task_initial_interval_ms)
            .field("task_max_interval_ms", &self.task_max_interval_ms)
            .field("task_timeout_secs", &self.task_timeout_secs)
            .finish()
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl DmeConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to dme.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("dme-aseries")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the environment variable
    /// and TOML key of the first empty required field, and
    /// [`ConfigError::Invalid`] for inconsistent task intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.backend_id,
            &FieldMetadata::new("backend identifier", "DME_BACKEND_ID", "backend_id"),
        )?;
        Self::require_field(
            &self.url_list().join(","),
            &FieldMetadata::new("management URLs", "DME_URLS", "urls"),
        )?;
        Self::require_field(
            &self.user,
            &FieldMetadata::new("login user", "DME_USER", "user"),
        )?;
        Self::require_field(
            &self.password,
            &FieldMetadata::new("login password", "DME_PASSWORD", "password"),
        )?;
        if self.task_initial_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "task_initial_interval_ms must be greater than zero",
            )));
        }
        if self.task_max_interval_ms < self.task_initial_interval_ms {
            return Err(ConfigError::Invalid(String::from(
                "task_max_interval_ms must not be smaller than task_initial_interval_ms",
            )));
        }
        Ok(())
    }

    /// Returns the candidate URLs with blanks removed.
    #[must_use]
    pub fn url_list(&self) -> Vec<String> {
        self.urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Returns the task waiting policy.
    #[must_use]
    pub const fn task_policy(&self) -> TaskPolicy {
        TaskPolicy {
            initial_interval: Duration::from_millis(self.task_initial_interval_ms),
            max_interval: Duration::from_millis(self.task_max_interval_ms),
            timeout: Duration::from_secs(self.task_timeout_secs),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates fields whose values contradict each other.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
