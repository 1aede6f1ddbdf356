//! # Lode Telemetry
//!
//! Observability for Lode services:
//!
//! - **Logging**: `tracing-subscriber` formatter, JSON or pretty
//! - **Metrics**: Prometheus recorder behind the `metrics` facade
//! - **Exporters**: [`MetricsExporter`] and [`JsonTraceExporter`], to be
//!   combined with the core exporters through [`Fanout`](lode_core::Fanout)
//! - **Timing**: [`TimingStation`] measures traversals from inside a shaft
//!
//! # Example
//!
//! ```rust,ignore
//! use lode_core::{Fanout, LogExporter};
//! use lode_telemetry::{init_telemetry, MetricsExporter, TelemetryConfig, TimingStation};
//! use std::sync::Arc;
//!
//! init_telemetry(&TelemetryConfig::builder().service_name("orders").build())?;
//!
//! let exporters = Arc::new(
//!     Fanout::new()
//!         .with_trace(Arc::new(LogExporter))
//!         .with_trace(Arc::new(MetricsExporter))
//!         .with_error(Arc::new(MetricsExporter)),
//! );
//! let shaft = Shaft::builder()
//!     .any_station(TimingStation::new())
//!     .terminal(PlaceOrder)
//!     .exporters(exporters)
//!     .build()?;
//!
//! println!("{}", lode_telemetry::render_metrics().unwrap_or_default());
//! ```

#![doc(html_root_url = "https://docs.rs/lode-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod metrics;
pub mod station;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use exporter::{JsonTraceExporter, MetricsExporter};
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use station::TimingStation;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Validates `config`, then installs logging and metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if the configuration is invalid or either
/// subsystem fails to install.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    config.validate()?;
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        json = config.logging.json_format,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_installs_nothing() {
        let config = TelemetryConfig::builder().service_name("").build();
        assert!(matches!(
            init_telemetry(&config),
            Err(TelemetryError::InvalidConfig(_))
        ));
    }
}
