//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Telemetry section.
///
/// # Example
///
/// ```
/// use lode_config::TelemetrySection;
///
/// let section: TelemetrySection = toml::from_str(r#"service_name = "orders""#).unwrap();
/// assert_eq!(section.service_name, "orders");
/// assert_eq!(section.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name reported when telemetry starts.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

fn default_service_name() -> String {
    "lode".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether to install a log subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info,lode::trace=debug`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include file and line in each event.
    #[serde(default)]
    pub file_line_info: bool,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::default(),
            file_line_info: false,
            span_events: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Whether to install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Basket duration histogram buckets, in seconds.
    #[serde(default = "default_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: default_buckets(),
        }
    }
}

fn default_buckets() -> Vec<f64> {
    lode_telemetry::MetricsConfig::default().duration_buckets
}

/// Shaft execution section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShaftSection {
    /// Hand failed baskets to the trace exporter.
    #[serde(default)]
    pub partial_traces: bool,

    /// Emit a `trace` event per visit.
    #[serde(default = "default_true")]
    pub log_visits: bool,
}

impl Default for ShaftSection {
    fn default() -> Self {
        Self {
            partial_traces: false,
            log_visits: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_names() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), r#""json""#);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let section: LoggingSection = toml::from_str(r#"level = "warn""#).unwrap();
        assert_eq!(section.level, "warn");
        assert!(section.enabled);
        assert_eq!(section.format, LogFormat::Json);

        let shaft: ShaftSection = toml::from_str("partial_traces = true").unwrap();
        assert!(shaft.partial_traces);
        assert!(shaft.log_visits);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<ShaftSection, _> = toml::from_str("partial_trace = true");
        assert!(result.is_err());

        let result: Result<MetricsSection, _> = serde_json::from_str(r#"{"addr": "0.0.0.0:9090"}"#);
        assert!(result.is_err());
    }
}
