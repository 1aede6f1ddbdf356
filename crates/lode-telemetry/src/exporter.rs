//! Exporters backed by metrics and JSON lines.

use crate::metrics::{record_basket, record_error, Outcome};
use lode_core::{BasketView, ErrorExporter, LodeError, Trace, TraceExporter};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;

/// Records basket and error counters through the `metrics` facade.
///
/// Completed baskets count as `success`. Failed baskets count as
/// `failure` only when the shaft hands them over, i.e. with partial traces
/// enabled; every failure still lands in `lode_errors_total`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsExporter;

impl TraceExporter for MetricsExporter {
    fn export(&self, basket: &dyn BasketView) {
        record_basket(basket.kind(), Outcome::Success, basket.visits().len());
    }

    fn export_partial(&self, basket: &dyn BasketView, _error: &LodeError) {
        record_basket(basket.kind(), Outcome::Failure, basket.visits().len());
    }
}

impl ErrorExporter for MetricsExporter {
    fn export_error(&self, error: &LodeError) {
        record_error(error.category());
    }

    fn export_message(&self, _message: &str) {}
}

#[derive(Serialize)]
struct TraceLine<'a> {
    #[serde(flatten)]
    trace: &'a Trace,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Writes one JSON object per trace, newline separated.
///
/// Partial traces carry an extra `error` field. Write failures are logged
/// and otherwise ignored.
///
/// # Example
///
/// ```
/// use lode_telemetry::JsonTraceExporter;
///
/// let exporter = JsonTraceExporter::new(Vec::new());
/// assert!(exporter.into_inner().is_empty());
/// ```
#[derive(Debug)]
pub struct JsonTraceExporter<W> {
    sink: Mutex<W>,
}

impl<W: Write + Send> JsonTraceExporter<W> {
    /// Creates an exporter writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }

    fn write(&self, trace: &Trace, error: Option<&LodeError>) {
        let line = TraceLine {
            trace,
            error: error.map(ToString::to_string),
        };
        let mut sink = self.sink.lock();
        let result = serde_json::to_writer(&mut *sink, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| sink.write_all(b"\n"))
            .and_then(|()| sink.flush());
        if let Err(e) = result {
            tracing::warn!(basket_id = %trace.basket_id, error = %e, "failed to write trace");
        }
    }
}

impl<W: Write + Send> TraceExporter for JsonTraceExporter<W> {
    fn export(&self, basket: &dyn BasketView) {
        self.write(&Trace::capture(basket), None);
    }

    fn export_partial(&self, basket: &dyn BasketView, error: &LodeError) {
        self.write(&Trace::capture(basket), Some(error));
    }
}
