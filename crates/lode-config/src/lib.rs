//! # Lode Config
//!
//! Typed configuration for Lode services:
//!
//! - TOML and JSON files
//! - `.env` files through `dotenvy`
//! - Environment overrides `PREFIX__SECTION__KEY`
//! - Strict parsing: unknown keys are errors
//!
//! # Configuration File Format
//!
//! ```toml
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info,lode::trace=debug"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! duration_buckets = [0.001, 0.01, 0.1, 1.0]
//!
//! [shaft]
//! partial_traces = false
//! log_visits = true
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lode_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("lode.toml")?
//!     .with_env_prefix("LODE")
//!     .load()?;
//!
//! lode_telemetry::init_telemetry(&config.telemetry_config())?;
//! let settings = config.shaft_settings();
//! # let _ = settings;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/lode-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::LodeConfig;
pub use error::ConfigError;
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::{LogFormat, LoggingSection, MetricsSection, ShaftSection, TelemetrySection};
