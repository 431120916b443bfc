//! Layered tracker configuration: defaults, then the TOML file, then
//! `IMS_TRACKER_*` environment variables, then explicit overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "ims-tracker.toml";
pub const NESTED_CONFIG_FILE: &str = "config/ims-tracker.toml";

const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub auth_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Values set programmatically; they win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub api_max_retries: Option<u32>,
    pub api_auth_token: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid tracker TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` is required but does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` is referenced in the config file but not set in the environment")]
    MissingEnvInterpolation { var: String },
    #[error("config file contains a `${{` without a closing `}}`")]
    UnterminatedInterpolation,
    #[error("`{key}` has an unusable value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid tracker configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3001/api".to_string(),
                timeout_secs: 15,
                max_retries: 1,
                auth_token: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "logging.format `{other}` is not one of compact|pretty|json"
            ))),
        }
    }
}

impl ApiConfig {
    pub fn bearer_token(&self) -> Option<&str> {
        self.auth_token.as_ref().map(|token| token.expose_secret()).filter(|token| !token.is_empty())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.merge(read_patch(&path)?),
            None if options.require_file => {
                return Err(ConfigError::MissingConfigFile(
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
                ));
            }
            None => {}
        }

        config.merge(ConfigPatch::from_env()?);
        config.merge(ConfigPatch::from(options.overrides));
        config.validate()?;

        Ok(config)
    }

    fn merge(&mut self, patch: ConfigPatch) {
        let ConfigPatch { api, logging } = patch;

        if let Some(api) = api {
            merge_field(&mut self.api.base_url, api.base_url);
            merge_field(&mut self.api.timeout_secs, api.timeout_secs);
            merge_field(&mut self.api.max_retries, api.max_retries);
            if let Some(token) = api.auth_token {
                self.api.auth_token = Some(SecretString::from(token));
            }
        }

        if let Some(logging) = logging {
            merge_field(&mut self.logging.level, logging.level);
            merge_field(&mut self.logging.format, logging.format);
        }
    }

    /// Reports every problem at once so a misconfigured deployment is fixed in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            problems.push(format!("api.base_url `{base_url}` needs an http:// or https:// scheme"));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.api.timeout_secs) {
            problems.push(format!(
                "api.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                self.api.timeout_secs
            ));
        }
        if self.api.max_retries > 1 {
            problems.push(format!(
                "api.max_retries must be 0 or 1, got {}; reads are retried at most once",
                self.api.max_retries
            ));
        }
        if !matches!(
            self.logging.level.trim().to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            problems.push(format!(
                "logging.level `{}` is not one of trace|debug|info|warn|error",
                self.logging.level
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => [DEFAULT_CONFIG_FILE, NESTED_CONFIG_FILE]
            .into_iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists()),
    }
}

fn merge_field<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str(&expand_env_references(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces each `${NAME}` with the value of environment variable `NAME`.
fn expand_env_references(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// First non-blank value among `keys`, paired with the key it came from.
fn env_value(keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    })
}

fn env_parsed<T: FromStr>(keys: &[&'static str]) -> Result<Option<T>, ConfigError> {
    env_value(keys)
        .map(|(key, value)| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl ConfigPatch {
    fn from_env() -> Result<Self, ConfigError> {
        let format = match env_value(&["IMS_TRACKER_LOGGING_FORMAT", "IMS_TRACKER_LOG_FORMAT"]) {
            Some((_, value)) => Some(value.parse::<LogFormat>()?),
            None => None,
        };

        Ok(Self {
            api: Some(ApiPatch {
                base_url: env_value(&["IMS_TRACKER_API_BASE_URL"]).map(|(_, value)| value),
                timeout_secs: env_parsed(&["IMS_TRACKER_API_TIMEOUT_SECS"])?,
                max_retries: env_parsed(&["IMS_TRACKER_API_MAX_RETRIES"])?,
                auth_token: env_value(&["IMS_TRACKER_API_AUTH_TOKEN"]).map(|(_, value)| value),
            }),
            logging: Some(LoggingPatch {
                level: env_value(&["IMS_TRACKER_LOGGING_LEVEL", "IMS_TRACKER_LOG_LEVEL"])
                    .map(|(_, value)| value),
                format,
            }),
        })
    }
}

impl From<ConfigOverrides> for ConfigPatch {
    fn from(overrides: ConfigOverrides) -> Self {
        Self {
            api: Some(ApiPatch {
                base_url: overrides.api_base_url,
                timeout_secs: overrides.api_timeout_secs,
                max_retries: overrides.api_max_retries,
                auth_token: overrides.api_auth_token,
            }),
            logging: Some(LoggingPatch { level: overrides.log_level, format: overrides.log_format }),
        }
    }
}
