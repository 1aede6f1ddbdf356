//! Station traits.
//!
//! A station is a bidirectional middleware unit. Its `descend` hook runs on
//! the way to the terminal and may rewrite the request or veto the call; its
//! `ascend` hook runs on the way back and may rewrite the response.
//!
//! # Example
//!
//! ```
//! use lode_core::{Basket, BoxFuture, LodeResult, Options, Reply, Request, RequestId};
//! use lode_shaft::Station;
//!
//! struct Greet {
//!     id: RequestId,
//!     options: Options,
//!     name: String,
//! }
//!
//! impl Request for Greet {
//!     type Response = Reply<String>;
//!     fn id(&self) -> RequestId { self.id }
//!     fn options(&self) -> &Options { &self.options }
//! }
//!
//! struct Trim;
//!
//! impl Station<Greet> for Trim {
//!     fn descend<'a>(&'a self, basket: &'a mut Basket<Greet>) -> BoxFuture<'a, LodeResult<()>> {
//!         Box::pin(async move {
//!             let trimmed = basket.request().name.trim().to_string();
//!             basket.request_mut().name = trimmed;
//!             Ok(())
//!         })
//!     }
//! }
//!
//! assert_eq!(Station::<Greet>::name(&Trim), "Trim");
//! ```

use lode_core::{short_type_name, Basket, BasketView, BoxFuture, LodeResult, Request};
use std::sync::Arc;

/// A station typed to one request/response pair.
///
/// One instance serves every basket sent through its shaft, possibly
/// concurrently. Anything scoped to a single call belongs in the basket
/// (see [`Basket::extensions_mut`]), not in the station.
pub trait Station<R: Request>: Send + Sync + 'static {
    /// Name recorded in the visit log. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Runs before the terminal. Returning `Err` halts the traversal.
    fn descend<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        let _ = basket;
        Box::pin(async { Ok(()) })
    }

    /// Runs after the terminal, in reverse chain order.
    fn ascend<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        let _ = basket;
        Box::pin(async { Ok(()) })
    }
}

/// A payload-agnostic station.
///
/// Works against [`BasketView`], so a single implementation can join
/// shafts of any request type. Wrap it in [`Broad`] (or use
/// `ShaftBuilder::any_station`) to place it in a chain.
pub trait AnyStation: Send + Sync + 'static {
    /// Name recorded in the visit log. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Runs before the terminal. Returning `Err` halts the traversal.
    fn descend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        let _ = basket;
        Box::pin(async { Ok(()) })
    }

    /// Runs after the terminal, in reverse chain order.
    fn ascend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        let _ = basket;
        Box::pin(async { Ok(()) })
    }
}

/// Adapts an [`AnyStation`] into a [`Station`] for every request type.
#[derive(Clone)]
pub struct Broad(Arc<dyn AnyStation>);

impl Broad {
    /// Wraps a payload-agnostic station.
    pub fn new(station: impl AnyStation) -> Self {
        Self(Arc::new(station))
    }

    /// Wraps an already shared payload-agnostic station.
    pub fn from_arc(station: Arc<dyn AnyStation>) -> Self {
        Self(station)
    }

    /// Returns the wrapped station.
    pub fn inner(&self) -> &Arc<dyn AnyStation> {
        &self.0
    }
}

impl std::fmt::Debug for Broad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Broad").field(&self.0.name()).finish()
    }
}

impl<R: Request> Station<R> for Broad {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn descend<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        self.0.descend(basket)
    }

    fn ascend<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        self.0.ascend(basket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_core::{Direction, LodeError, Options, Reply, RequestId};

    struct Ping {
        id: RequestId,
        options: Options,
    }

    impl Request for Ping {
        type Response = Reply<()>;

        fn id(&self) -> RequestId {
            self.id
        }

        fn options(&self) -> &Options {
            &self.options
        }
    }

    fn basket() -> Basket<Ping> {
        Basket::new(Ping {
            id: RequestId::new(),
            options: Options::new(),
        })
    }

    struct Quiet;

    impl Station<Ping> for Quiet {}

    struct Stamp;

    impl AnyStation for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn descend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
            Box::pin(async move {
                basket.options_mut().insert("stamped", true);
                basket.log_message(format!("stamped {}", basket.kind()));
                Ok(())
            })
        }

        fn ascend<'a>(&'a self, _basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
            Box::pin(async { Err(LodeError::internal("stamp cannot ascend")) })
        }
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        let mut basket = basket();
        Quiet.descend(&mut basket).await.expect("noop descend");
        Quiet.ascend(&mut basket).await.expect("noop ascend");
        assert_eq!(Station::<Ping>::name(&Quiet), "Quiet");
        assert!(basket.options().is_empty());
    }

    #[tokio::test]
    async fn test_broad_forwards_to_any_station() {
        let broad = Broad::new(Stamp);
        let mut basket = basket();

        Station::<Ping>::descend(&broad, &mut basket)
            .await
            .expect("descend succeeds");
        basket.record_visit("stamp", Direction::Descending);

        assert_eq!(Station::<Ping>::name(&broad), "stamp");
        assert_eq!(basket.options().get("stamped"), Some(&true.into()));
        assert_eq!(basket.visits()[0].logs, vec!["stamped Ping"]);

        let err = Station::<Ping>::ascend(&broad, &mut basket)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("stamp cannot ascend"));
    }
}
