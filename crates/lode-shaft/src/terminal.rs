//! The terminal: the leaf handler of a shaft.

use lode_core::{short_type_name, Basket, BoxFuture, LodeResult, Request};
use std::marker::PhantomData;

/// Produces the response for a request.
///
/// On success `produce` must attach a response with
/// [`Basket::set_response`]; the shaft fails the call otherwise. Failures
/// of external work are returned as `Err`, never swallowed.
pub trait Terminal<R: Request>: Send + Sync + 'static {
    /// Name recorded in the visit log. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Produces the response for the basket's request.
    fn produce<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>>;
}

/// Terminal built from a closure that returns the response.
///
/// # Example
///
/// ```
/// use lode_core::{Options, Reply, Request, RequestId};
/// use lode_shaft::{FnTerminal, Terminal};
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
/// let terminal = FnTerminal::<Double, _>::new("double", |basket| {
///     Box::pin(async move {
///         let request = basket.request();
///         Ok(Reply::ok(request.id, request.value * 2))
///     })
/// });
/// assert_eq!(Terminal::<Double>::name(&terminal), "double");
/// ```
pub struct FnTerminal<R, F> {
    name: String,
    f: F,
    _request: PhantomData<fn() -> R>,
}

impl<R, F> FnTerminal<R, F>
where
    R: Request,
    F: for<'a> Fn(&'a Basket<R>) -> BoxFuture<'a, LodeResult<R::Response>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a named terminal from `f`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _request: PhantomData,
        }
    }
}

impl<R, F> std::fmt::Debug for FnTerminal<R, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTerminal")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<R, F> Terminal<R> for FnTerminal<R, F>
where
    R: Request,
    F: for<'a> Fn(&'a Basket<R>) -> BoxFuture<'a, LodeResult<R::Response>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn produce<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let response = (self.f)(&*basket).await?;
            basket.set_response(response)
        })
    }
}
