//! Trace and error exporters.
//!
//! A shaft hands every completed basket to its [`TraceExporter`] and every
//! failure to its [`ErrorExporter`]. Exporters are shared across concurrent
//! calls, so they take `&self` and must be `Send + Sync`.

use crate::basket::{BasketView, Trace};
use crate::LodeError;
use std::sync::Arc;

/// Receives the traversal record of completed baskets.
pub trait TraceExporter: Send + Sync {
    /// Called once for each basket whose traversal completed.
    fn export(&self, basket: &dyn BasketView);

    /// Called for a basket whose traversal failed, when partial traces are
    /// enabled on the shaft. The default drops it.
    fn export_partial(&self, basket: &dyn BasketView, error: &LodeError) {
        let _ = (basket, error);
    }
}

/// Receives failures raised while handling a request.
pub trait ErrorExporter: Send + Sync {
    /// Called once for each failed invocation.
    fn export_error(&self, error: &LodeError);

    /// Reports a free-form diagnostic that has no error value attached.
    fn export_message(&self, message: &str);
}

/// Exporter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

impl TraceExporter for NoopExporter {
    fn export(&self, _basket: &dyn BasketView) {}
}

impl ErrorExporter for NoopExporter {
    fn export_error(&self, _error: &LodeError) {}

    fn export_message(&self, _message: &str) {}
}

/// Exporter that writes traces and errors as `tracing` events.
///
/// This is the default exporter for shafts and mines. Traces are emitted
/// at `DEBUG` on the `lode::trace` target; errors at `WARN` (or `ERROR`
/// for internal failures) on `lode::error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter;

impl TraceExporter for LogExporter {
    fn export(&self, basket: &dyn BasketView) {
        let trace = Trace::capture(basket);
        let visits: Vec<String> = trace.visits.iter().map(ToString::to_string).collect();
        tracing::debug!(
            target: "lode::trace",
            basket_id = %trace.basket_id,
            request_id = %trace.request_id,
            kind = trace.kind,
            parent = ?trace.parent.as_ref().map(|p| p.basket_id.to_string()),
            visit_count = visits.len(),
            elapsed_ms = u64::try_from(trace.elapsed_ms).unwrap_or(u64::MAX),
            visits = ?visits,
            "basket completed"
        );
    }

    fn export_partial(&self, basket: &dyn BasketView, error: &LodeError) {
        tracing::debug!(
            target: "lode::trace",
            basket_id = %basket.id(),
            request_id = %basket.request_id(),
            kind = basket.kind(),
            visit_count = basket.visits().len(),
            error = %error,
            "basket failed"
        );
    }
}

impl ErrorExporter for LogExporter {
    fn export_error(&self, error: &LodeError) {
        let category = error.category();
        if category == crate::ErrorCategory::Internal {
            tracing::error!(
                target: "lode::error",
                category = category.as_str(),
                code = error.error_code(),
                error = %error,
                "request failed"
            );
        } else {
            tracing::warn!(
                target: "lode::error",
                category = category.as_str(),
                code = error.error_code(),
                error = %error,
                "request failed"
            );
        }
    }

    fn export_message(&self, message: &str) {
        tracing::warn!(target: "lode::error", "{message}");
    }
}

/// The pair of exporters a shaft or mine reports to.
///
/// Defaults to [`LogExporter`] on both sides.
#[derive(Clone)]
pub struct LodeExporters {
    /// Receives completed (and, if enabled, partial) traces.
    pub trace: Arc<dyn TraceExporter>,
    /// Receives failures.
    pub error: Arc<dyn ErrorExporter>,
}

impl LodeExporters {
    /// Creates a pair from separate exporters.
    pub fn new(trace: Arc<dyn TraceExporter>, error: Arc<dyn ErrorExporter>) -> Self {
        Self { trace, error }
    }

    /// Uses one value for both sides.
    pub fn both<E>(exporter: Arc<E>) -> Self
    where
        E: TraceExporter + ErrorExporter + 'static,
    {
        Self {
            trace: exporter.clone(),
            error: exporter,
        }
    }
}

impl Default for LodeExporters {
    fn default() -> Self {
        Self::both(Arc::new(LogExporter))
    }
}

impl std::fmt::Debug for LodeExporters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LodeExporters").finish_non_exhaustive()
    }
}

/// Forwards to several exporters in registration order.
///
/// # Example
///
/// ```
/// use lode_core::{Fanout, LogExporter, NoopExporter};
/// use std::sync::Arc;
///
/// let fanout = Fanout::new()
///     .with_trace(Arc::new(LogExporter))
///     .with_trace(Arc::new(NoopExporter))
///     .with_error(Arc::new(LogExporter));
/// assert_eq!(fanout.len(), 3);
/// ```
#[derive(Clone, Default)]
pub struct Fanout {
    traces: Vec<Arc<dyn TraceExporter>>,
    errors: Vec<Arc<dyn ErrorExporter>>,
}

impl Fanout {
    /// Creates an empty fanout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trace exporter.
    pub fn with_trace(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.traces.push(exporter);
        self
    }

    /// Adds an error exporter.
    pub fn with_error(mut self, exporter: Arc<dyn ErrorExporter>) -> Self {
        self.errors.push(exporter);
        self
    }

    /// Total number of exporters.
    pub fn len(&self) -> usize {
        self.traces.len() + self.errors.len()
    }

    /// Returns `true` if no exporter is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout")
            .field("traces", &self.traces.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl TraceExporter for Fanout {
    fn export(&self, basket: &dyn BasketView) {
        for exporter in &self.traces {
            exporter.export(basket);
        }
    }

    fn export_partial(&self, basket: &dyn BasketView, error: &LodeError) {
        for exporter in &self.traces {
            exporter.export_partial(basket, error);
        }
    }
}

impl ErrorExporter for Fanout {
    fn export_error(&self, error: &LodeError) {
        for exporter in &self.errors {
            exporter.export_error(error);
        }
    }

    fn export_message(&self, message: &str) {
        for exporter in &self.errors {
            exporter.export_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Basket, Options, Reply, Request, RequestId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        id: RequestId,
        options: Options,
    }

    impl Request for Probe {
        type Response = Reply<()>;

        fn id(&self) -> RequestId {
            self.id
        }

        fn options(&self) -> &Options {
            &self.options
        }
    }

    #[derive(Default)]
    struct Counter {
        traces: AtomicUsize,
        partials: AtomicUsize,
        errors: AtomicUsize,
        messages: AtomicUsize,
    }

    impl TraceExporter for Counter {
        fn export(&self, _basket: &dyn BasketView) {
            self.traces.fetch_add(1, Ordering::SeqCst);
        }

        fn export_partial(&self, _basket: &dyn BasketView, _error: &LodeError) {
            self.partials.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ErrorExporter for Counter {
        fn export_error(&self, _error: &LodeError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn export_message(&self, _message: &str) {
            self.messages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_forwards_to_every_exporter() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let fanout = Fanout::new()
            .with_trace(a.clone())
            .with_trace(b.clone())
            .with_error(a.clone());

        let basket = Basket::new(Probe {
            id: RequestId::new(),
            options: Options::new(),
        });
        fanout.export(&basket);
        fanout.export_partial(&basket, &LodeError::terminal("boom"));
        fanout.export_error(&LodeError::terminal("boom"));
        fanout.export_message("note");

        assert_eq!(a.traces.load(Ordering::SeqCst), 1);
        assert_eq!(b.traces.load(Ordering::SeqCst), 1);
        assert_eq!(a.partials.load(Ordering::SeqCst), 1);
        assert_eq!(a.errors.load(Ordering::SeqCst), 1);
        assert_eq!(a.messages.load(Ordering::SeqCst), 1);
        assert_eq!(b.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_log_exporter_does_not_panic_without_subscriber() {
        let basket = Basket::new(Probe {
            id: RequestId::new(),
            options: Options::new(),
        });
        LogExporter.export(&basket);
        LogExporter.export_partial(&basket, &LodeError::validation("bad"));
        LogExporter.export_error(&LodeError::internal("broken"));
        LogExporter.export_message("hello");
    }

    #[test]
    fn test_empty_fanout() {
        let fanout = Fanout::new();
        assert!(fanout.is_empty());
        assert!(format!("{fanout:?}").contains("traces"));
    }
}
