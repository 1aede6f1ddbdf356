//! Timing station.

use crate::metrics::record_duration;
use lode_core::{BasketView, BoxFuture, LodeResult};
use lode_shaft::AnyStation;
use std::time::{Duration, Instant};

/// Descend timestamp left in the basket extensions by [`TimingStation`].
#[derive(Debug, Clone, Copy)]
pub struct DescendedAt(pub Instant);

/// Elapsed time measured by [`TimingStation`], left in the basket
/// extensions after ascend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationTiming(pub Duration);

/// Measures the time between its own descend and ascend.
///
/// Put it first in a chain to time the whole traversal. On ascend it
/// records `lode_basket_duration_seconds` and adds a `took …` line to its
/// visit. Failed traversals never reach ascend and are not timed.
///
/// # Example
///
/// ```
/// use lode_shaft::AnyStation;
/// use lode_telemetry::TimingStation;
///
/// assert_eq!(TimingStation::new().name(), "timing");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStation;

impl TimingStation {
    /// Creates a timing station.
    pub fn new() -> Self {
        Self
    }
}

impl AnyStation for TimingStation {
    fn name(&self) -> &str {
        "timing"
    }

    fn descend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            basket.extensions_mut().insert(DescendedAt(Instant::now()));
            Ok(())
        })
    }

    fn ascend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let Some(DescendedAt(start)) = basket.extensions_mut().remove::<DescendedAt>() else {
                return Ok(());
            };
            let elapsed = start.elapsed();
            record_duration(basket.kind(), elapsed);
            basket.log_message(format!("took {}us", elapsed.as_micros()));
            basket.extensions_mut().insert(StationTiming(elapsed));
            Ok(())
        })
    }
}
