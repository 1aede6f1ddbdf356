//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::schema::LogFormat;
use crate::{ConfigError, LodeConfig};

/// Source format of configuration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Parses a format name (`"toml"` or `"json"`, any case).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnsupportedFormat` for any other name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(name.to_string())),
        }
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        path.extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))
            .and_then(Self::from_name)
    }

    fn parse(self, content: &str) -> Result<LodeConfig, ConfigError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

/// Loads a [`LodeConfig`] in layers.
///
/// Later layers override earlier ones:
/// 1. Built-in defaults or a preset
/// 2. A configuration file or string (replaces the previous layer)
/// 3. Environment variables `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use lode_config::ConfigLoader;
///
/// # fn main() -> Result<(), lode_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("lode.toml")?
///     .with_dotenv()?
///     .with_env_prefix("LODE")
///     .load()?;
///
/// println!("partial traces: {}", config.shaft.partial_traces);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: LodeConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = LodeConfig::default();
        self
    }

    /// Resets to the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = LodeConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = LodeConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// Sections and keys missing from the file take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or unreadable, has another extension,
    /// does not parse, or contains unknown keys.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.config = format.parse(&content)?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::with_file`]; a missing file is not an error.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration text in the named format (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Fails on an unknown format name, a parse error or unknown keys.
    ///
    /// # Example
    ///
    /// ```
    /// use lode_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[shaft]\npartial_traces = true", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.shaft.partial_traces);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = ConfigFormat::from_name(format)?.parse(content)?;
        Ok(self)
    }

    /// Enables environment overrides under `prefix` (upper-cased).
    ///
    /// With prefix `LODE`:
    /// - `LODE__TELEMETRY__SERVICE_NAME=orders`
    /// - `LODE__TELEMETRY__LOGGING__LEVEL=debug`
    /// - `LODE__TELEMETRY__METRICS__DURATION_BUCKETS=0.01,0.1,1`
    /// - `LODE__SHAFT__PARTIAL_TRACES=true`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory or its parents, if present.
    ///
    /// Variables already set in the process are not overwritten.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if a `.env` file exists but cannot
    /// be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), ".env loaded");
                Ok(self)
            }
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::read_error(".env", std::io::Error::other(e))),
        }
    }

    /// Loads variables from a specific `.env`-style file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path)
            .map_err(|e| ConfigError::read_error(path, std::io::Error::other(e)))?;
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` for a malformed or unknown
    /// override, or the first validation failure.
    pub fn load(self) -> Result<LodeConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` for a malformed or unknown
    /// override.
    pub fn load_unvalidated(mut self) -> Result<LodeConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        Ok(self.config)
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        overrides.sort();

        for (key, value) in overrides {
            let path = &key[marker.len()..];
            self.apply_env_var(&key, path, &value)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let telemetry = &mut self.config.telemetry;
        let shaft = &mut self.config.shaft;

        match parts.as_slice() {
            ["TELEMETRY", "SERVICE_NAME"] => telemetry.service_name = value.to_string(),

            ["TELEMETRY", "LOGGING", "ENABLED"] => telemetry.logging.enabled = bool_var(key, value)?,
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["TELEMETRY", "LOGGING", "FILE_LINE_INFO"] => {
                telemetry.logging.file_line_info = bool_var(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "SPAN_EVENTS"] => {
                telemetry.logging.span_events = bool_var(key, value)?;
            }

            ["TELEMETRY", "METRICS", "ENABLED"] => telemetry.metrics.enabled = bool_var(key, value)?,
            ["TELEMETRY", "METRICS", "DURATION_BUCKETS"] => {
                telemetry.metrics.duration_buckets = value
                    .split(',')
                    .map(|b| b.trim().parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected comma-separated numbers"))?;
            }

            ["SHAFT", "PARTIAL_TRACES"] => shaft.partial_traces = bool_var(key, value)?,
            ["SHAFT", "LOG_VISITS"] => shaft.log_visits = bool_var(key, value)?,

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        tracing::debug!(var = key, "configuration override applied");
        Ok(())
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, LodeConfig::default());
    }

    #[test]
    fn test_presets_load() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(!config.shaft.log_visits);
    }

    #[test]
    fn test_json_string() {
        let json = r#"{ "telemetry": { "service_name": "billing", "metrics": { "enabled": false } } }"#;
        let config = ConfigLoader::new().with_string(json, "JSON").unwrap().load().unwrap();
        assert_eq!(config.telemetry.service_name, "billing");
        assert!(!config.telemetry.metrics.enabled);
        assert_eq!(config.telemetry.logging.level, "info");
    }

    #[test]
    fn test_unknown_format() {
        let err = ConfigLoader::new().with_string("", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = ConfigLoader::new()
            .with_string("[shaft]\nretries = 3", "toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));

        let err = ConfigLoader::new()
            .with_string(r#"{ "server": {} }"#, "json")
            .unwrap_err();
        assert!(matches!(err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_load_validates_but_unvalidated_does_not() {
        let toml = "[telemetry.metrics]\nduration_buckets = [1.0, 0.5]";
        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load_unvalidated()
            .unwrap();
        assert_eq!(config.telemetry.metrics.duration_buckets, vec![1.0, 0.5]);

        let err = ConfigLoader::new().with_string(toml, "toml").unwrap().load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/lode.TOML")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("lode.yaml")).is_err());
        assert!(ConfigFormat::from_path(Path::new("lode")).is_err());
    }
}
