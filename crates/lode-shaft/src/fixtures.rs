//! Test fixtures for Lode development and testing.
//!
//! Reusable spies for asserting how a shaft drove its components:
//!
//! - [`MemoryExporter`] keeps every trace, partial trace and error it receives
//! - [`Journal`] + [`RecordingStation`] record hook order across stations
//! - [`CountingTerminal`] counts how often a terminal ran
//!
//! # Example
//!
//! ```
//! use lode_shaft::fixtures::{Journal, MemoryExporter};
//!
//! let exporter = MemoryExporter::new();
//! assert_eq!(exporter.trace_count(), 0);
//!
//! let journal = Journal::new();
//! journal.push("descend:a");
//! assert_eq!(journal.entries(), vec!["descend:a"]);
//! ```

use crate::station::{AnyStation, Station};
use crate::terminal::Terminal;
use lode_core::{
    Basket, BasketView, BoxFuture, ErrorExporter, LodeError, LodeResult, Request, Trace,
    TraceExporter,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Exporter that stores everything in memory.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    traces: Mutex<Vec<Trace>>,
    partials: Mutex<Vec<(Trace, String)>>,
    errors: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl MemoryExporter {
    /// Creates an empty exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed traces, in export order.
    pub fn traces(&self) -> Vec<Trace> {
        self.traces.lock().clone()
    }

    /// Partial traces with the message of the error that ended them.
    pub fn partials(&self) -> Vec<(Trace, String)> {
        self.partials.lock().clone()
    }

    /// Messages of exported errors.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Free-form messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Number of completed traces.
    pub fn trace_count(&self) -> usize {
        self.traces.lock().len()
    }

    /// Number of partial traces.
    pub fn partial_count(&self) -> usize {
        self.partials.lock().len()
    }

    /// Number of exported errors.
    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }
}

impl TraceExporter for MemoryExporter {
    fn export(&self, basket: &dyn BasketView) {
        self.traces.lock().push(Trace::capture(basket));
    }

    fn export_partial(&self, basket: &dyn BasketView, error: &LodeError) {
        self.partials
            .lock()
            .push((Trace::capture(basket), error.to_string()));
    }
}

impl ErrorExporter for MemoryExporter {
    fn export_error(&self, error: &LodeError) {
        self.errors.lock().push(error.to_string());
    }

    fn export_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Shared, ordered record of hook invocations.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// Returns a copy of all entries.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Station that writes `descend:<name>` / `ascend:<name>` to a journal.
///
/// Works with every request type.
#[derive(Debug, Clone)]
pub struct RecordingStation {
    name: String,
    journal: Journal,
    fail_descend: bool,
    fail_ascend: bool,
}

impl RecordingStation {
    /// Creates a station that always succeeds.
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
            fail_descend: false,
            fail_ascend: false,
        }
    }

    /// Makes the descend hook fail with a validation error.
    pub fn fail_on_descend(mut self) -> Self {
        self.fail_descend = true;
        self
    }

    /// Makes the ascend hook fail with a validation error.
    pub fn fail_on_ascend(mut self) -> Self {
        self.fail_ascend = true;
        self
    }

    fn hit(&self, hook: &str, fail: bool) -> LodeResult<()> {
        self.journal.push(format!("{hook}:{}", self.name));
        if fail {
            return Err(LodeError::validation(format!(
                "{} rejected on {hook}",
                self.name
            )));
        }
        Ok(())
    }
}

impl<R: Request> Station<R> for RecordingStation {
    fn name(&self) -> &str {
        &self.name
    }

    fn descend<'a>(&'a self, _basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move { self.hit("descend", self.fail_descend) })
    }

    fn ascend<'a>(&'a self, _basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move { self.hit("ascend", self.fail_ascend) })
    }
}

impl AnyStation for RecordingStation {
    fn name(&self) -> &str {
        &self.name
    }

    fn descend<'a>(&'a self, _basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move { self.hit("descend", self.fail_descend) })
    }

    fn ascend<'a>(&'a self, _basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move { self.hit("ascend", self.fail_ascend) })
    }
}

/// Handle to the number of times a [`CountingTerminal`] ran.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Current count.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Terminal wrapper that counts invocations before delegating.
pub struct CountingTerminal<T> {
    inner: T,
    calls: CallCounter,
}

impl<T> CountingTerminal<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: CallCounter::default(),
        }
    }

    /// Returns a handle to the invocation count.
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<R, T> Terminal<R> for CountingTerminal<T>
where
    R: Request,
    T: Terminal<R>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn produce<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        self.calls.increment();
        self.inner.produce(basket)
    }
}
