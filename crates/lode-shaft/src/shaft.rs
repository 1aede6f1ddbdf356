//! The shaft execution engine.
//!
//! A shaft is an ordered chain of stations in front of one terminal. Each
//! basket sent through it walks the chain down, turns at the terminal, and
//! walks back up:
//!
//! ```text
//! send ─► station 0 ─► station 1 ─► … ─► station N-1 ─► terminal
//!                                                          │
//! basket ◄─ station 0 ◄─ station 1 ◄─ … ◄─ station N-1 ◄───┘
//! ```
//!
//! Every traversed component appends a [`Visit`](lode_core::Visit) to the
//! basket. The first `Err` from any hook or the terminal halts the walk:
//! nothing after it runs, the error goes to the error exporter once and is
//! returned to the caller.

use crate::station::{AnyStation, Broad, Station};
use crate::terminal::Terminal;
use lode_core::{
    Basket, Direction, ErrorExporter, LodeError, LodeExporters, LodeResult, Request,
    TraceExporter,
};
use std::sync::Arc;
use tracing::Instrument;

/// A shared, type-erased station in a chain.
pub type SharedStation<R> = Arc<dyn Station<R>>;

/// Behavior switches for a shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaftSettings {
    /// Hand the partial basket of a failed traversal to
    /// [`TraceExporter::export_partial`].
    pub partial_traces: bool,
    /// Emit a `trace` level event for every recorded visit.
    pub log_visits: bool,
}

impl Default for ShaftSettings {
    fn default() -> Self {
        Self {
            partial_traces: false,
            log_visits: true,
        }
    }
}

/// Position of a traversal in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Descending(usize),
    AtTerminal,
    Ascending(usize),
    Completed,
}

/// Ordered station chain plus one terminal.
///
/// Build one with [`Shaft::builder`]. A shaft holds no per-call state and
/// can serve any number of concurrent `send` calls.
///
/// # Example
///
/// ```
/// use lode_core::{Basket, BoxFuture, LodeResult, Options, Reply, Request, RequestId};
/// use lode_shaft::{Shaft, Terminal};
///
/// struct Double {
///     id: RequestId,
///     options: Options,
///     value: i64,
/// }
///
/// impl Request for Double {
///     type Response = Reply<i64>;
///     fn id(&self) -> RequestId { self.id }
///     fn options(&self) -> &Options { &self.options }
/// }
///
/// struct Doubler;
///
/// impl Terminal<Double> for Doubler {
///     fn produce<'a>(&'a self, basket: &'a mut Basket<Double>) -> BoxFuture<'a, LodeResult<()>> {
///         Box::pin(async move {
///             let reply = Reply::ok(basket.request().id, basket.request().value * 2);
///             basket.set_response(reply)
///         })
///     }
/// }
///
/// # block_on(async {
/// let shaft = Shaft::builder().terminal(Doubler).build().unwrap();
/// let request = Double { id: RequestId::new(), options: Options::new(), value: 5 };
/// let basket = shaft.send(Basket::new(request)).await.unwrap();
/// assert_eq!(basket.response().and_then(|r| r.value), Some(10));
/// assert_eq!(basket.visits().len(), 1);
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct Shaft<R: Request> {
    name: String,
    stations: Vec<SharedStation<R>>,
    terminal: Arc<dyn Terminal<R>>,
    trace_exporter: Arc<dyn TraceExporter>,
    error_exporter: Arc<dyn ErrorExporter>,
    settings: ShaftSettings,
}

impl<R: Request> Shaft<R> {
    /// Creates a new shaft builder.
    pub fn builder() -> ShaftBuilder<R> {
        ShaftBuilder::new()
    }

    /// Sends a basket through the chain and back.
    ///
    /// Returns the basket with its response and complete visit log.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a descend hook or the terminal
    /// unchanged. An ascend hook failure is wrapped in
    /// [`LodeError::Ascend`]. A terminal that returns `Ok` without a
    /// response yields [`LodeError::MissingResponse`].
    pub async fn send(&self, mut basket: Basket<R>) -> LodeResult<Basket<R>> {
        let span = tracing::debug_span!(
            "shaft",
            shaft = %self.name,
            basket_id = %basket.id(),
            kind = R::kind(),
        );

        async move {
            match self.traverse(&mut basket).await {
                Ok(()) => {
                    tracing::debug!(visits = basket.visits().len(), "traversal completed");
                    self.trace_exporter.export(&basket);
                    Ok(basket)
                }
                Err(error) => {
                    tracing::debug!(
                        visits = basket.visits().len(),
                        category = error.category().as_str(),
                        "traversal failed"
                    );
                    if self.settings.partial_traces {
                        self.trace_exporter.export_partial(&basket, &error);
                    }
                    self.error_exporter.export_error(&error);
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn traverse(&self, basket: &mut Basket<R>) -> LodeResult<()> {
        let mut step = if self.stations.is_empty() {
            Step::AtTerminal
        } else {
            Step::Descending(0)
        };

        loop {
            step = match step {
                Step::Descending(index) => {
                    let station = &self.stations[index];
                    let result = station.descend(basket).await;
                    self.record(basket, station.name(), Direction::Descending, result.as_ref().err());
                    result?;

                    if index + 1 < self.stations.len() {
                        Step::Descending(index + 1)
                    } else {
                        Step::AtTerminal
                    }
                }
                Step::AtTerminal => {
                    let name = self.terminal.name();
                    let result = match self.terminal.produce(basket).await {
                        Ok(()) if basket.response().is_none() => {
                            Err(LodeError::missing_response(name))
                        }
                        other => other,
                    };
                    self.record(basket, name, Direction::Descending, result.as_ref().err());
                    result?;

                    match self.stations.len() {
                        0 => Step::Completed,
                        count => Step::Ascending(count - 1),
                    }
                }
                Step::Ascending(index) => {
                    let station = &self.stations[index];
                    let result = station
                        .ascend(basket)
                        .await
                        .map_err(|error| LodeError::ascend(station.name(), error));
                    self.record(basket, station.name(), Direction::Ascending, result.as_ref().err());
                    result?;

                    if index == 0 {
                        Step::Completed
                    } else {
                        Step::Ascending(index - 1)
                    }
                }
                Step::Completed => return Ok(()),
            };
        }
    }

    fn record(
        &self,
        basket: &mut Basket<R>,
        name: &str,
        direction: Direction,
        error: Option<&LodeError>,
    ) {
        if let Some(error) = error {
            basket.log(format!("failed: {error}"));
        }
        if self.settings.log_visits {
            tracing::trace!(
                component = name,
                direction = direction.as_str(),
                failed = error.is_some(),
                "visit"
            );
        }
        basket.record_visit(name, direction);
    }

    /// Returns the shaft name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the station names in chain order.
    pub fn station_names(&self) -> Vec<&str> {
        self.stations.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of stations.
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Returns the terminal name.
    pub fn terminal_name(&self) -> &str {
        self.terminal.name()
    }

    /// Returns the shaft settings.
    pub fn settings(&self) -> ShaftSettings {
        self.settings
    }
}

impl<R: Request> std::fmt::Debug for Shaft<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shaft")
            .field("name", &self.name)
            .field("stations", &self.station_names())
            .field("terminal", &self.terminal.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Shaft`].
pub struct ShaftBuilder<R: Request> {
    name: Option<String>,
    stations: Vec<SharedStation<R>>,
    terminal: Option<Arc<dyn Terminal<R>>>,
    trace_exporter: Option<Arc<dyn TraceExporter>>,
    error_exporter: Option<Arc<dyn ErrorExporter>>,
    settings: ShaftSettings,
}

impl<R: Request> ShaftBuilder<R> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            name: None,
            stations: Vec::new(),
            terminal: None,
            trace_exporter: None,
            error_exporter: None,
            settings: ShaftSettings::default(),
        }
    }

    /// Sets the shaft name. Defaults to the request kind.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a station to the chain.
    pub fn station<S: Station<R>>(mut self, station: S) -> Self {
        self.stations.push(Arc::new(station));
        self
    }

    /// Appends an already shared station to the chain.
    pub fn shared_station(mut self, station: SharedStation<R>) -> Self {
        self.stations.push(station);
        self
    }

    /// Appends a payload-agnostic station to the chain.
    pub fn any_station<S: AnyStation>(self, station: S) -> Self {
        self.station(Broad::new(station))
    }

    /// Appends several shared stations, in order.
    pub fn stations<I>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = SharedStation<R>>,
    {
        self.stations.extend(stations);
        self
    }

    /// Sets the terminal.
    pub fn terminal<T: Terminal<R>>(mut self, terminal: T) -> Self {
        self.terminal = Some(Arc::new(terminal));
        self
    }

    /// Sets an already shared terminal.
    pub fn shared_terminal(mut self, terminal: Arc<dyn Terminal<R>>) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Sets the trace exporter. Defaults to [`LogExporter`](lode_core::LogExporter).
    pub fn trace_exporter(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.trace_exporter = Some(exporter);
        self
    }

    /// Sets the error exporter. Defaults to [`LogExporter`](lode_core::LogExporter).
    pub fn error_exporter(mut self, exporter: Arc<dyn ErrorExporter>) -> Self {
        self.error_exporter = Some(exporter);
        self
    }

    /// Sets both exporters from one value.
    pub fn exporters<E>(self, exporter: Arc<E>) -> Self
    where
        E: TraceExporter + ErrorExporter + 'static,
    {
        self.trace_exporter(exporter.clone()).error_exporter(exporter)
    }

    /// Sets both exporters from a shared pair.
    pub fn exporter_pair(self, exporters: &LodeExporters) -> Self {
        self.trace_exporter(exporters.trace.clone())
            .error_exporter(exporters.error.clone())
    }

    /// Sets the behavior switches.
    pub fn settings(mut self, settings: ShaftSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the number of stations added so far.
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Builds the shaft.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Internal`] if no terminal was set.
    pub fn build(self) -> LodeResult<Shaft<R>> {
        let terminal = self.terminal.ok_or_else(|| {
            LodeError::internal(format!("shaft for {} has no terminal", R::kind()))
        })?;
        let exporters = LodeExporters::default();

        Ok(Shaft {
            name: self.name.unwrap_or_else(|| R::kind().to_string()),
            stations: self.stations,
            terminal,
            trace_exporter: self.trace_exporter.unwrap_or(exporters.trace),
            error_exporter: self.error_exporter.unwrap_or(exporters.error),
            settings: self.settings,
        })
    }
}

impl<R: Request> Default for ShaftBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{CountingTerminal, Journal, MemoryExporter, RecordingStation};
    use lode_core::{BoxFuture, Options, Reply, RequestId};

    #[derive(Debug)]
    struct Count {
        id: RequestId,
        options: Options,
        value: i64,
    }

    impl Count {
        fn new(value: i64) -> Self {
            Self {
                id: RequestId::new(),
                options: Options::new(),
                value,
            }
        }
    }

    impl Request for Count {
        type Response = Reply<i64>;

        fn id(&self) -> RequestId {
            self.id
        }

        fn options(&self) -> &Options {
            &self.options
        }
    }

    struct Echo;

    impl Terminal<Count> for Echo {
        fn produce<'a>(&'a self, basket: &'a mut Basket<Count>) -> BoxFuture<'a, LodeResult<()>> {
            Box::pin(async move {
                let reply = Reply::ok(basket.request().id, basket.request().value);
                basket.set_response(reply)
            })
        }
    }

    struct Silent;

    impl Terminal<Count> for Silent {
        fn produce<'a>(&'a self, _basket: &'a mut Basket<Count>) -> BoxFuture<'a, LodeResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_build_without_terminal_fails() {
        let err = Shaft::<Count>::builder().build().unwrap_err();
        assert!(matches!(err, LodeError::Internal { .. }));
    }

    #[test]
    fn test_default_name_is_request_kind() {
        let shaft = Shaft::builder().terminal(Echo).build().expect("valid shaft");
        assert_eq!(shaft.name(), "Count");
        assert_eq!(shaft.terminal_name(), "Echo");
        assert_eq!(shaft.station_count(), 0);
    }

    #[tokio::test]
    async fn test_visit_order_with_stations() {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = Shaft::builder()
            .station(RecordingStation::new("a", journal.clone()))
            .station(RecordingStation::new("b", journal.clone()))
            .terminal(Echo)
            .exporters(exporter.clone())
            .build()
            .expect("valid shaft");

        let basket = shaft.send(Basket::new(Count::new(3))).await.expect("send succeeds");

        let visits: Vec<String> = basket.visits().iter().map(ToString::to_string).collect();
        assert_eq!(visits, vec!["v a", "v b", "v Echo", "^ b", "^ a"]);
        assert_eq!(
            journal.entries(),
            vec!["descend:a", "descend:b", "ascend:b", "ascend:a"]
        );
        assert_eq!(exporter.trace_count(), 1);
        assert_eq!(exporter.error_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_response_fails_before_ascend() {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = Shaft::builder()
            .station(RecordingStation::new("a", journal.clone()))
            .terminal(Silent)
            .exporters(exporter.clone())
            .build()
            .expect("valid shaft");

        let err = shaft.send(Basket::new(Count::new(1))).await.unwrap_err();
        assert!(matches!(err, LodeError::MissingResponse { .. }));
        assert_eq!(journal.entries(), vec!["descend:a"]);
        assert_eq!(exporter.error_count(), 1);
        assert_eq!(exporter.trace_count(), 0);
    }

    #[tokio::test]
    async fn test_ascend_failure_is_wrapped_and_halts() {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = Shaft::builder()
            .station(RecordingStation::new("outer", journal.clone()))
            .station(RecordingStation::new("inner", journal.clone()).fail_on_ascend())
            .terminal(Echo)
            .exporters(exporter.clone())
            .build()
            .expect("valid shaft");

        let err = shaft.send(Basket::new(Count::new(1))).await.unwrap_err();
        match &err {
            LodeError::Ascend { station, .. } => assert_eq!(station, "inner"),
            other => panic!("expected ascend failure, got {other:?}"),
        }
        assert_eq!(
            journal.entries(),
            vec!["descend:outer", "descend:inner", "ascend:inner"]
        );
        assert_eq!(exporter.error_count(), 1);
        assert_eq!(exporter.trace_count(), 0);
        assert_eq!(exporter.partial_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_trace_records_failing_visit() {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = Shaft::builder()
            .station(RecordingStation::new("guard", journal.clone()).fail_on_descend())
            .terminal(Echo)
            .exporters(exporter.clone())
            .settings(ShaftSettings {
                partial_traces: true,
                ..ShaftSettings::default()
            })
            .build()
            .expect("valid shaft");

        shaft.send(Basket::new(Count::new(1))).await.unwrap_err();

        let partials = exporter.partials();
        assert_eq!(partials.len(), 1);
        let (trace, message) = &partials[0];
        assert_eq!(trace.visits.len(), 1);
        assert!(trace.visits[0].logs[0].starts_with("failed: "));
        assert!(message.contains("guard"));
        assert_eq!(exporter.trace_count(), 0);
    }

    #[tokio::test]
    async fn test_counting_terminal_counts_calls() {
        let terminal = CountingTerminal::new(Echo);
        let calls = terminal.calls();
        let shaft = Shaft::builder()
            .terminal(terminal)
            .exporters(Arc::new(MemoryExporter::new()))
            .build()
            .expect("valid shaft");

        shaft.send(Basket::new(Count::new(1))).await.expect("first");
        shaft.send(Basket::new(Count::new(2))).await.expect("second");
        assert_eq!(calls.get(), 2);
        assert_eq!(shaft.terminal_name(), "Echo");
    }
}
