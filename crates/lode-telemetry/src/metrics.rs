//! Prometheus metrics.
//!
//! Metrics are recorded through the `metrics` facade. [`init_metrics`]
//! installs a Prometheus recorder; without it every recording call is a
//! cheap no-op.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Recorded by |
//! |--------|------|--------|-------------|
//! | `lode_baskets_total` | Counter | `kind`, `outcome` | [`MetricsExporter`](crate::MetricsExporter) |
//! | `lode_basket_duration_seconds` | Histogram | `kind` | [`TimingStation`](crate::TimingStation) |
//! | `lode_errors_total` | Counter | `category` | [`MetricsExporter`](crate::MetricsExporter) |
//! | `lode_station_visits_total` | Counter | `kind` | [`MetricsExporter`](crate::MetricsExporter) |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use lode_core::ErrorCategory;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Counter of finished baskets.
pub const BASKETS_TOTAL: &str = "lode_baskets_total";
/// Histogram of traversal durations.
pub const BASKET_DURATION_SECONDS: &str = "lode_basket_duration_seconds";
/// Counter of exported errors.
pub const ERRORS_TOTAL: &str = "lode_errors_total";
/// Counter of station visits.
pub const STATION_VISITS_TOTAL: &str = "lode_station_visits_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Outcome label of [`BASKETS_TOTAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The traversal completed with a response.
    Success,
    /// The traversal failed.
    Failure,
}

impl Outcome {
    /// Label value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the recorder.
    pub enabled: bool,

    /// Histogram buckets for basket duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// Calling it again after a successful install is a no-op.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if the buckets are rejected or
/// another recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(BASKET_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    tracing::debug!(buckets = config.duration_buckets.len(), "metrics recorder installed");

    Ok(())
}

/// Returns the recorder handle if metrics were initialized.
pub fn metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders all metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(BASKETS_TOTAL, "Baskets that finished a traversal, by outcome");
    describe_histogram!(
        BASKET_DURATION_SECONDS,
        Unit::Seconds,
        "Time from the first descend to the last ascend"
    );
    describe_counter!(ERRORS_TOTAL, "Errors reported to exporters, by category");
    describe_counter!(STATION_VISITS_TOTAL, "Visits recorded on finished baskets");
}

/// Records a finished basket.
pub fn record_basket(kind: &str, outcome: Outcome, visits: usize) {
    counter!(
        BASKETS_TOTAL,
        "kind" => kind.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    counter!(STATION_VISITS_TOTAL, "kind" => kind.to_string())
        .increment(u64::try_from(visits).unwrap_or(u64::MAX));
}

/// Records a traversal duration.
pub fn record_duration(kind: &str, duration: Duration) {
    histogram!(BASKET_DURATION_SECONDS, "kind" => kind.to_string()).record(duration.as_secs_f64());
}

/// Records an exported error.
pub fn record_error(category: ErrorCategory) {
    counter!(ERRORS_TOTAL, "category" => category.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buckets_are_increasing() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Success.as_str(), "success");
        assert_eq!(Outcome::Failure.as_str(), "failure");
    }

    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        record_basket("Quote", Outcome::Success, 3);
        record_duration("Quote", Duration::from_millis(4));
        record_error(ErrorCategory::Routing);
    }

    #[test]
    fn test_disabled_metrics_is_a_no_op() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }
}
