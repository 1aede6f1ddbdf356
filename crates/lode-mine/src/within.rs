//! Nested invocation.
//!
//! A terminal or station working on one basket can call any other
//! registered request type through [`Within`]. The nested call gets its own
//! basket, linked to the caller's basket as its parent, and runs to
//! completion before the caller continues.
//!
//! # Example
//!
//! ```
//! use lode_core::{Basket, BoxFuture, LodeResult, Options, Reply, Request, RequestId};
//! use lode_mine::WithinExt;
//! use lode_shaft::Terminal;
//!
//! struct Price {
//!     id: RequestId,
//!     options: Options,
//!     sku: String,
//! }
//!
//! impl Request for Price {
//!     type Response = Reply<u64>;
//!     fn id(&self) -> RequestId { self.id }
//!     fn options(&self) -> &Options { &self.options }
//! }
//!
//! struct Quote {
//!     id: RequestId,
//!     options: Options,
//!     sku: String,
//!     quantity: u64,
//! }
//!
//! impl Request for Quote {
//!     type Response = Reply<u64>;
//!     fn id(&self) -> RequestId { self.id }
//!     fn options(&self) -> &Options { &self.options }
//! }
//!
//! struct Quoter;
//!
//! impl Terminal<Quote> for Quoter {
//!     fn produce<'a>(&'a self, basket: &'a mut Basket<Quote>) -> BoxFuture<'a, LodeResult<()>> {
//!         Box::pin(async move {
//!             let price = Price {
//!                 id: RequestId::new(),
//!                 options: Options::new(),
//!                 sku: basket.request().sku.clone(),
//!             };
//!             let unit = basket.within().send(price).await?.value.unwrap_or(0);
//!             let reply = Reply::ok(basket.request().id, unit * basket.request().quantity);
//!             basket.set_response(reply)
//!         })
//!     }
//! }
//! ```

use crate::registry::MineRegistry;
use lode_core::{Basket, LodeError, LodeResult, ParentLink, Request};

/// Handle for issuing nested calls on behalf of a parent basket.
///
/// Holds only the parent's identifiers and the registry to call through,
/// so it can be used while the parent basket is mutably borrowed.
#[derive(Debug, Clone)]
pub struct Within {
    parent: ParentLink,
    registry: Option<MineRegistry>,
}

impl Within {
    /// Captures the lineage and registry of `basket`.
    ///
    /// The registry is the one attached to the basket by
    /// [`MineRegistry::send`]; if there is none, the global registry is used
    /// at call time.
    pub fn new<R: Request>(basket: &Basket<R>) -> Self {
        Self {
            parent: basket.link(),
            registry: basket.extensions().get::<MineRegistry>().cloned(),
        }
    }

    /// The parent link every nested basket will carry.
    pub fn parent(&self) -> &ParentLink {
        &self.parent
    }

    /// Calls `request` and returns the nested basket.
    ///
    /// The nested basket starts from `request`'s own options. Nothing is
    /// copied from the caller's basket, so a nested call that needs an
    /// access token or other option must set it on `request`.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Routing`] if no registry is available or none
    /// serves `Q`, otherwise whatever the nested shaft returns.
    pub async fn send_basket<Q: Request>(&self, request: Q) -> LodeResult<Basket<Q>> {
        let registry = self.resolve::<Q>()?;
        let basket = Basket::new(request).with_parent(self.parent.clone());

        tracing::debug!(
            parent = %self.parent.basket_id,
            parent_kind = self.parent.kind,
            kind = Q::kind(),
            depth = self.parent.depth + 1,
            "nested invocation"
        );
        registry.send(basket).await
    }

    /// Calls `request` and returns its response.
    ///
    /// # Errors
    ///
    /// See [`Within::send_basket`]; also fails if the nested shaft completed
    /// without a response.
    pub async fn send<Q: Request>(&self, request: Q) -> LodeResult<Q::Response> {
        self.send_basket(request).await?.into_response()
    }

    fn resolve<Q: Request>(&self) -> LodeResult<MineRegistry> {
        self.registry
            .clone()
            .or_else(|| MineRegistry::global().cloned())
            .ok_or_else(|| LodeError::routing(Q::kind(), "no mine registry available"))
    }
}

/// Adds [`within`](WithinExt::within) to every basket.
pub trait WithinExt {
    /// Returns a handle for nested calls made on behalf of this basket.
    fn within(&self) -> Within;
}

impl<R: Request> WithinExt for Basket<R> {
    fn within(&self) -> Within {
        Within::new(self)
    }
}
