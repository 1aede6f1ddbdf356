//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::schema::{LogFormat, ShaftSection, TelemetrySection};
use crate::ConfigError;
use lode_shaft::ShaftSettings;
use lode_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

/// Complete configuration of a Lode service.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use lode_config::LodeConfig;
///
/// let config = LodeConfig::default();
/// assert_eq!(config.telemetry.service_name, "lode");
/// assert!(!config.shaft.partial_traces);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LodeConfig {
    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,

    /// Shaft execution switches.
    #[serde(default)]
    pub shaft: ShaftSection,
}

impl LodeConfig {
    /// Checks the loaded values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the service name is blank
    /// - the log level is not a valid filter directive
    /// - the duration buckets are empty or not strictly increasing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if let Err(e) = lode_telemetry::logging::create_env_filter(&self.telemetry.logging.level) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                e.to_string(),
            ));
        }

        let buckets = &self.telemetry.metrics.duration_buckets;
        if buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.duration_buckets",
                "must not be empty",
            ));
        }
        if !buckets.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.duration_buckets",
                "must be strictly increasing",
            ));
        }

        Ok(())
    }

    /// Preset for local development: pretty `debug` logs with locations,
    /// and partial traces so failed baskets are visible.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.file_line_info = true;
        config.telemetry.logging.span_events = true;
        config.shaft.partial_traces = true;
        config
    }

    /// Preset for production: JSON `info` logs and no per-visit events.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.shaft.log_visits = false;
        config
    }

    /// Settings to pass to `ShaftBuilder::settings`.
    pub fn shaft_settings(&self) -> ShaftSettings {
        ShaftSettings {
            partial_traces: self.shaft.partial_traces,
            log_visits: self.shaft.log_visits,
        }
    }

    /// Configuration to pass to `lode_telemetry::init_telemetry`.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        let logging = &self.telemetry.logging;
        let defaults = LogConfig::production();
        TelemetryConfig {
            service_name: self.telemetry.service_name.clone(),
            logging: LogConfig {
                enabled: logging.enabled,
                level: logging.level.clone(),
                json_format: logging.format == LogFormat::Json,
                span_events: logging.span_events,
                file_line_info: logging.file_line_info,
                ..defaults
            },
            metrics: MetricsConfig {
                enabled: self.telemetry.metrics.enabled,
                duration_buckets: self.telemetry.metrics.duration_buckets.clone(),
            },
        }
    }
}
