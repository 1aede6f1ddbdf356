//! End-to-end shaft tests.
//!
//! These tests drive complete shafts and check the traversal contract:
//!
//! 1. Descend hooks run in chain order, ascend hooks in reverse
//! 2. The terminal is recorded once, on the way down
//! 3. The first failure halts everything after it
//! 4. Exporters see exactly one trace or one error per call
//! 5. Concurrent baskets never share visits or responses

use lode_core::{
    Basket, BoxFuture, Direction, ErrorCategory, LodeError, LodeResult, Options, Reply, Request,
    RequestId, ACCESS_TOKEN,
};
use lode_shaft::fixtures::{CountingTerminal, Journal, MemoryExporter, RecordingStation};
use lode_shaft::stations::{AccessStation, ValidationStation};
use lode_shaft::{Shaft, ShaftSettings, Station, Terminal};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone)]
struct Double {
    id: RequestId,
    options: Options,
    value: i64,
}

impl Double {
    fn new(value: i64) -> Self {
        Self {
            id: RequestId::new(),
            options: Options::new(),
            value,
        }
    }
}

impl Request for Double {
    type Response = Reply<i64>;

    fn id(&self) -> RequestId {
        self.id
    }

    fn options(&self) -> &Options {
        &self.options
    }
}

#[derive(Debug, Clone)]
struct Greet {
    id: RequestId,
    options: Options,
    name: String,
}

impl Greet {
    fn new(name: &str) -> Self {
        Self {
            id: RequestId::new(),
            options: Options::new(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Greeting {
    request_id: RequestId,
    greeting: String,
}

impl lode_core::Response for Greeting {
    fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl Request for Greet {
    type Response = Greeting;

    fn id(&self) -> RequestId {
        self.id
    }

    fn options(&self) -> &Options {
        &self.options
    }
}

// ============================================================================
// Components
// ============================================================================

struct Doubler;

impl Terminal<Double> for Doubler {
    fn produce<'a>(&'a self, basket: &'a mut Basket<Double>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let request = basket.request();
            let reply = Reply::ok(request.id, request.value * 2);
            basket.set_response(reply)
        })
    }
}

struct Greeter;

impl Terminal<Greet> for Greeter {
    fn produce<'a>(&'a self, basket: &'a mut Basket<Greet>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let greeting = Greeting {
                request_id: basket.request().id,
                greeting: format!("Hello {}", basket.request().name),
            };
            basket.log("greeted");
            basket.set_response(greeting)
        })
    }
}

/// Wraps the name in `*` on the way down, reverses the greeting on the way up.
struct Starry;

impl Station<Greet> for Starry {
    fn descend<'a>(&'a self, basket: &'a mut Basket<Greet>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let starred = format!("*{}*", basket.request().name);
            basket.request_mut().name = starred;
            Ok(())
        })
    }

    fn ascend<'a>(&'a self, basket: &'a mut Basket<Greet>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            if let Some(response) = basket.response_mut() {
                response.greeting = response.greeting.chars().rev().collect();
            }
            Ok(())
        })
    }
}

/// Yields to the runtime on both legs so concurrent baskets interleave.
struct Yielding;

impl Station<Double> for Yielding {
    fn descend<'a>(&'a self, basket: &'a mut Basket<Double>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            basket.log(format!("value {}", basket.request().value));
            Ok(())
        })
    }

    fn ascend<'a>(&'a self, basket: &'a mut Basket<Double>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            basket.log(format!("value {}", basket.request().value));
            Ok(())
        })
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn recording_shaft(
    count: usize,
    fail_at: Option<usize>,
    journal: &Journal,
    exporter: &Arc<MemoryExporter>,
) -> Shaft<Double> {
    let mut builder = Shaft::builder()
        .terminal(Doubler)
        .exporters(exporter.clone());
    for index in 0..count {
        let station = RecordingStation::new(format!("s{index}"), journal.clone());
        builder = if fail_at == Some(index) {
            builder.station(station.fail_on_descend())
        } else {
            builder.station(station)
        };
    }
    builder.build().expect("valid shaft")
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_zero_stations_doubles_value() {
    let exporter = Arc::new(MemoryExporter::new());
    let shaft = Shaft::builder()
        .terminal(Doubler)
        .exporters(exporter.clone())
        .build()
        .expect("valid shaft");

    let basket = shaft.send(Basket::new(Double::new(5))).await.expect("send");

    assert_eq!(basket.response().and_then(|r| r.value), Some(10));
    assert_eq!(basket.visits().len(), 1);
    assert_eq!(basket.visits()[0].description, "Doubler");
    assert_eq!(basket.visits()[0].direction, Direction::Descending);
    assert_eq!(exporter.trace_count(), 1);
}

#[tokio::test]
async fn test_station_rewrites_request_and_response() {
    let shaft = Shaft::builder()
        .station(Starry)
        .terminal(Greeter)
        .exporters(Arc::new(MemoryExporter::new()))
        .build()
        .expect("valid shaft");

    let basket = shaft.send(Basket::new(Greet::new("Ann"))).await.expect("send");

    let expected: String = "Hello *Ann*".chars().rev().collect();
    assert_eq!(
        basket.response().map(|r| r.greeting.as_str()),
        Some(expected.as_str())
    );

    let visits = basket.visits();
    assert_eq!(visits.len(), 3);
    assert_eq!(visits[0].to_string(), "v Starry");
    assert_eq!(visits[1].to_string(), "v Greeter | greeted");
    assert_eq!(visits[2].to_string(), "^ Starry");
}

#[tokio::test]
async fn test_validation_rejects_empty_field_before_terminal() {
    let exporter = Arc::new(MemoryExporter::new());
    let terminal = CountingTerminal::new(Greeter);
    let calls = terminal.calls();
    let shaft = Shaft::builder()
        .station(ValidationStation::<Greet>::new().require("name", |r| r.name.as_str()))
        .terminal(terminal)
        .exporters(exporter.clone())
        .build()
        .expect("valid shaft");

    let err = shaft.send(Basket::new(Greet::new(""))).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(calls.get(), 0);
    assert_eq!(exporter.error_count(), 1);
    assert_eq!(exporter.trace_count(), 0);
}

#[tokio::test]
async fn test_access_then_validation_chain() {
    let exporter = Arc::new(MemoryExporter::new());
    let shaft = Shaft::builder()
        .any_station(AccessStation::grants().grant("t-1", ["Greet"]).build())
        .station(ValidationStation::<Greet>::new().require("name", |r| r.name.as_str()))
        .terminal(Greeter)
        .exporters(exporter.clone())
        .build()
        .expect("valid shaft");
    assert_eq!(shaft.station_names(), vec!["access", "validation"]);

    let mut request = Greet::new("Bo");
    request.options.insert(ACCESS_TOKEN, "t-1");
    let basket = shaft.send(Basket::new(request)).await.expect("granted");
    assert_eq!(basket.visits()[0].to_string(), "v access | access granted");

    let err = shaft.send(Basket::new(Greet::new("Bo"))).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authentication);
    assert_eq!(exporter.trace_count(), 1);
    assert_eq!(exporter.error_count(), 1);
}

#[tokio::test]
async fn test_terminal_failure_skips_every_ascend() {
    struct Unavailable;

    impl Terminal<Double> for Unavailable {
        fn produce<'a>(&'a self, _basket: &'a mut Basket<Double>) -> BoxFuture<'a, LodeResult<()>> {
            Box::pin(async {
                let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "store timed out");
                Err(LodeError::terminal_with_source("store unavailable", io))
            })
        }
    }

    let journal = Journal::new();
    let exporter = Arc::new(MemoryExporter::new());
    let shaft = Shaft::builder()
        .station(RecordingStation::new("a", journal.clone()))
        .station(RecordingStation::new("b", journal.clone()))
        .terminal(Unavailable)
        .exporters(exporter.clone())
        .build()
        .expect("valid shaft");

    let err = shaft.send(Basket::new(Double::new(1))).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Terminal);
    assert_eq!(journal.entries(), vec!["descend:a", "descend:b"]);
    assert_eq!(exporter.error_count(), 1);
    assert!(exporter.errors()[0].contains("store unavailable"));
}

#[tokio::test]
async fn test_concurrent_baskets_are_isolated() {
    let shaft = Arc::new(
        Shaft::builder()
            .station(Yielding)
            .station(Yielding)
            .terminal(Doubler)
            .exporters(Arc::new(MemoryExporter::new()))
            .build()
            .expect("valid shaft"),
    );

    let mut handles = Vec::new();
    for value in 0..32_i64 {
        let shaft = shaft.clone();
        handles.push(tokio::spawn(async move {
            // Same content for every pair of tasks.
            let basket = shaft.send(Basket::new(Double::new(value / 2))).await?;
            Ok::<_, LodeError>((value / 2, basket))
        }));
    }

    for handle in handles {
        let (value, basket) = handle.await.expect("task").expect("send");
        assert_eq!(basket.response().and_then(|r| r.value), Some(value * 2));
        assert_eq!(basket.visits().len(), 5);
        let tag = format!("value {value}");
        for visit in basket.visits().iter().filter(|v| v.description == "Yielding") {
            assert_eq!(visit.logs, vec![tag.clone()]);
        }
    }
}

#[tokio::test]
async fn test_partial_traces_follow_settings() {
    let journal = Journal::new();
    let exporter = Arc::new(MemoryExporter::new());
    let shaft = Shaft::builder()
        .station(RecordingStation::new("a", journal.clone()).fail_on_ascend())
        .terminal(Doubler)
        .exporters(exporter.clone())
        .settings(ShaftSettings {
            partial_traces: true,
            log_visits: false,
        })
        .build()
        .expect("valid shaft");

    let err = shaft.send(Basket::new(Double::new(2))).await.unwrap_err();
    assert!(err.is_ascend());

    let partials = exporter.partials();
    assert_eq!(partials.len(), 1);
    let visits: Vec<&str> = partials[0]
        .0
        .visits
        .iter()
        .map(|v| v.description.as_str())
        .collect();
    assert_eq!(visits, vec!["a", "Doubler", "a"]);
    assert_eq!(exporter.trace_count(), 0);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_successful_traversal_records_two_n_plus_one_visits(count in 0usize..10) {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = recording_shaft(count, None, &journal, &exporter);

        let basket = runtime()
            .block_on(shaft.send(Basket::new(Double::new(1))))
            .expect("send");
        let visits = basket.visits();

        prop_assert_eq!(visits.len(), 2 * count + 1);
        for (index, visit) in visits.iter().take(count).enumerate() {
            prop_assert_eq!(visit.direction, Direction::Descending);
            prop_assert_eq!(&visit.description, &format!("s{index}"));
        }
        prop_assert_eq!(&visits[count].description, "Doubler");
        prop_assert_eq!(visits[count].direction, Direction::Descending);
        for (offset, visit) in visits.iter().skip(count + 1).enumerate() {
            prop_assert_eq!(visit.direction, Direction::Ascending);
            prop_assert_eq!(&visit.description, &format!("s{}", count - 1 - offset));
        }
        prop_assert_eq!(exporter.trace_count(), 1);
    }

    #[test]
    fn prop_descend_failure_halts_later_hooks(
        (count, fail_at) in (1usize..10).prop_flat_map(|n| (Just(n), 0..n))
    ) {
        let journal = Journal::new();
        let exporter = Arc::new(MemoryExporter::new());
        let shaft = recording_shaft(count, Some(fail_at), &journal, &exporter);

        let result = runtime().block_on(shaft.send(Basket::new(Double::new(1))));

        prop_assert!(result.is_err());
        let expected: Vec<String> = (0..=fail_at).map(|i| format!("descend:s{i}")).collect();
        prop_assert_eq!(journal.entries(), expected);
        prop_assert_eq!(exporter.error_count(), 1);
        prop_assert_eq!(exporter.trace_count(), 0);
    }
}
