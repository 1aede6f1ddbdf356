//! The basket: per-call context that flows through a shaft.
//!
//! A [`Basket`] carries the request down through the stations, picks up the
//! response at the terminal, and carries both back up. Everything scoped to
//! one call (visits, options, extensions, lineage) lives here, so stations
//! and terminals can be shared across concurrent calls.

use crate::extensions::Extensions;
use crate::message::{Request, Response};
use crate::visit::{Direction, Visit};
use crate::{BasketId, LodeError, LodeResult, Options, RequestId};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Non-owning reference from a nested basket to the basket that spawned it.
///
/// Only identifiers are kept, so a child never keeps its parent alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLink {
    /// Identity of the parent basket.
    pub basket_id: BasketId,
    /// Correlation ID of the parent's request.
    pub request_id: RequestId,
    /// Request kind of the parent.
    pub kind: &'static str,
    /// Nesting depth of the parent; 0 for a basket with no parent itself.
    pub depth: usize,
}

/// Per-invocation context for a request of type `R`.
///
/// # Example
///
/// ```
/// use lode_core::{Basket, Options, Reply, Request, RequestId};
///
/// struct Ping {
///     id: RequestId,
///     options: Options,
/// }
///
/// impl Request for Ping {
///     type Response = Reply<()>;
///     fn id(&self) -> RequestId { self.id }
///     fn options(&self) -> &Options { &self.options }
/// }
///
/// let ping = Ping { id: RequestId::new(), options: Options::new() };
/// let mut basket = Basket::new(ping);
/// let id = basket.request().id;
/// basket.set_response(Reply::ok(id, ())).unwrap();
/// assert!(basket.response().is_some());
/// ```
pub struct Basket<R: Request> {
    id: BasketId,
    request: R,
    response: Option<R::Response>,
    visits: Vec<Visit>,
    pending_logs: Vec<String>,
    parent: Option<ParentLink>,
    options: Options,
    extensions: Extensions,
    started_at: Instant,
}

impl<R: Request> Basket<R> {
    /// Creates a basket for `request`, copying the request's options.
    pub fn new(request: R) -> Self {
        let options = request.options().clone();
        Self {
            id: BasketId::new(),
            request,
            response: None,
            visits: Vec::new(),
            pending_logs: Vec::new(),
            parent: None,
            options,
            extensions: Extensions::new(),
            started_at: Instant::now(),
        }
    }

    /// Marks this basket as spawned from within another basket.
    #[must_use]
    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builder-style option insert.
    #[must_use]
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Returns the basket's identity.
    pub fn id(&self) -> BasketId {
        self.id
    }

    /// Returns the request.
    pub fn request(&self) -> &R {
        &self.request
    }

    /// Returns the request mutably, for stations that normalize input.
    pub fn request_mut(&mut self) -> &mut R {
        &mut self.request
    }

    /// Returns the response, once the terminal has produced one.
    pub fn response(&self) -> Option<&R::Response> {
        self.response.as_ref()
    }

    /// Returns the response mutably, for stations on the ascend leg.
    pub fn response_mut(&mut self) -> Option<&mut R::Response> {
        self.response.as_mut()
    }

    /// Attaches the response.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Correlation`] if the response answers a
    /// different request than the one in this basket.
    pub fn set_response(&mut self, response: R::Response) -> LodeResult<()> {
        let expected = self.request.id();
        let actual = response.request_id();
        if expected != actual {
            return Err(LodeError::Correlation {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        self.response = Some(response);
        Ok(())
    }

    /// Consumes the basket and returns its response.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::MissingResponse`] if no response was attached.
    pub fn into_response(self) -> LodeResult<R::Response> {
        self.response
            .ok_or_else(|| LodeError::missing_response(R::kind()))
    }

    /// Consumes the basket, returning request and response.
    pub fn into_parts(self) -> (R, Option<R::Response>) {
        (self.request, self.response)
    }

    /// Returns the visit log.
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    /// Records a message against the component currently running.
    ///
    /// Messages are attached to the visit the engine records when that
    /// component finishes, so callers never need to know their position.
    pub fn log(&mut self, message: impl Into<String>) {
        self.pending_logs.push(message.into());
    }

    /// Appends a visit, attaching every message logged since the last one.
    ///
    /// Called by the shaft engine after each hook and the terminal.
    pub fn record_visit(&mut self, description: impl Into<String>, direction: Direction) {
        let mut visit = Visit::new(description, direction);
        visit.logs = std::mem::take(&mut self.pending_logs);
        self.visits.push(visit);
    }

    /// Returns the parent link, if this basket was spawned by a nested call.
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Returns a link describing this basket, for use as a child's parent.
    pub fn link(&self) -> ParentLink {
        ParentLink {
            basket_id: self.id,
            request_id: self.request.id(),
            kind: R::kind(),
            depth: self.parent.as_ref().map_or(0, |p| p.depth + 1),
        }
    }

    /// Returns the basket options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the basket options mutably.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Returns call-scoped typed storage.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns call-scoped typed storage mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Time since the basket was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl<R> std::fmt::Debug for Basket<R>
where
    R: Request + std::fmt::Debug,
    R::Response: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Basket")
            .field("id", &self.id)
            .field("kind", &R::kind())
            .field("request", &self.request)
            .field("response", &self.response)
            .field("visits", &self.visits)
            .field("parent", &self.parent)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Payload-agnostic view of a basket.
///
/// Exporters and cross-cutting stations work against this view so they can
/// handle baskets of any request type.
pub trait BasketView: Send + Sync {
    /// Identity of the basket.
    fn id(&self) -> BasketId;
    /// Correlation ID of the request.
    fn request_id(&self) -> RequestId;
    /// Request kind tag.
    fn kind(&self) -> &'static str;
    /// Lineage link, if this is a nested basket.
    fn parent(&self) -> Option<&ParentLink>;
    /// The visit log so far.
    fn visits(&self) -> &[Visit];
    /// Basket options.
    fn options(&self) -> &Options;
    /// Basket options, mutably.
    fn options_mut(&mut self) -> &mut Options;
    /// Typed call-scoped storage.
    fn extensions(&self) -> &Extensions;
    /// Typed call-scoped storage, mutably.
    fn extensions_mut(&mut self) -> &mut Extensions;
    /// Records a message against the running component.
    fn log_message(&mut self, message: String);
    /// Returns `true` once a response is attached.
    fn has_response(&self) -> bool;
    /// Error indicator of the attached response, if any.
    fn response_error(&self) -> Option<&str>;
    /// Time since the basket was created.
    fn elapsed(&self) -> Duration;
}

impl<R: Request> BasketView for Basket<R> {
    fn id(&self) -> BasketId {
        self.id
    }

    fn request_id(&self) -> RequestId {
        self.request.id()
    }

    fn kind(&self) -> &'static str {
        R::kind()
    }

    fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    fn visits(&self) -> &[Visit] {
        &self.visits
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    fn log_message(&mut self, message: String) {
        self.pending_logs.push(message);
    }

    fn has_response(&self) -> bool {
        self.response.is_some()
    }

    fn response_error(&self) -> Option<&str> {
        self.response.as_ref().and_then(Response::error)
    }

    fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Serializable snapshot of a basket's traversal.
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    /// Identity of the basket.
    pub basket_id: BasketId,
    /// Correlation ID of the request.
    pub request_id: RequestId,
    /// Request kind tag.
    pub kind: &'static str,
    /// Lineage link, if nested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    /// Visit log.
    pub visits: Vec<Visit>,
    /// Milliseconds since the basket was created.
    pub elapsed_ms: u128,
}

impl Trace {
    /// Captures a snapshot of `basket`.
    pub fn capture(basket: &dyn BasketView) -> Self {
        Self {
            basket_id: basket.id(),
            request_id: basket.request_id(),
            kind: basket.kind(),
            parent: basket.parent().cloned(),
            visits: basket.visits().to_vec(),
            elapsed_ms: basket.elapsed().as_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reply;

    #[derive(Debug)]
    struct Echo {
        id: RequestId,
        options: Options,
        text: String,
    }

    impl Echo {
        fn new(text: &str) -> Self {
            Self {
                id: RequestId::new(),
                options: Options::new().with("locale", "en"),
                text: text.to_string(),
            }
        }
    }

    impl Request for Echo {
        type Response = Reply<String>;

        fn id(&self) -> RequestId {
            self.id
        }

        fn options(&self) -> &Options {
            &self.options
        }
    }

    #[test]
    fn test_new_copies_request_options() {
        let basket = Basket::new(Echo::new("hi"));
        assert_eq!(basket.options().get_str("locale"), Some("en"));
        assert!(basket.response().is_none());
        assert!(basket.visits().is_empty());
        assert!(basket.parent().is_none());
    }

    #[test]
    fn test_set_response_rejects_foreign_correlation() {
        let mut basket = Basket::new(Echo::new("hi"));
        let err = basket
            .set_response(Reply::ok(RequestId::new(), "x".to_string()))
            .unwrap_err();
        assert!(matches!(err, LodeError::Correlation { .. }));
        assert!(basket.response().is_none());
    }

    #[test]
    fn test_set_response_accepts_matching_correlation() {
        let mut basket = Basket::new(Echo::new("hi"));
        let id = basket.request().id;
        let text = basket.request().text.clone();
        basket.set_response(Reply::ok(id, text)).expect("matching id");
        assert_eq!(
            basket.into_response().expect("response set").value.as_deref(),
            Some("hi")
        );
    }

    #[test]
    fn test_into_response_without_response_fails() {
        let basket = Basket::new(Echo::new("hi"));
        assert!(matches!(
            basket.into_response(),
            Err(LodeError::MissingResponse { .. })
        ));
    }

    #[test]
    fn test_logs_attach_to_next_visit() {
        let mut basket = Basket::new(Echo::new("hi"));
        basket.log("first");
        basket.log("second");
        basket.record_visit("station-a", Direction::Descending);
        basket.record_visit("terminal", Direction::Descending);

        let visits = basket.visits();
        assert_eq!(visits[0].logs, vec!["first", "second"]);
        assert!(visits[1].logs.is_empty());
    }

    #[test]
    fn test_link_depth_grows_with_nesting() {
        let root = Basket::new(Echo::new("root"));
        let root_link = root.link();
        assert_eq!(root_link.depth, 0);
        assert_eq!(root_link.kind, "Echo");

        let child = Basket::new(Echo::new("child")).with_parent(root_link.clone());
        assert_eq!(child.parent(), Some(&root_link));
        assert_eq!(child.link().depth, 1);
    }

    #[test]
    fn test_trace_capture() {
        let mut basket = Basket::new(Echo::new("hi"));
        basket.record_visit("terminal", Direction::Descending);

        let trace = Trace::capture(&basket);
        assert_eq!(trace.basket_id, basket.id());
        assert_eq!(trace.visits.len(), 1);

        let json = serde_json::to_value(&trace).expect("should serialize");
        assert_eq!(json["kind"], "Echo");
        assert!(json.get("parent").is_none());
    }

    #[test]
    fn test_view_logging_goes_through_pending_buffer() {
        let mut basket = Basket::new(Echo::new("hi"));
        let view: &mut dyn BasketView = &mut basket;
        view.log_message("via view".to_string());
        view.options_mut().insert("seen", true);
        basket.record_visit("any", Direction::Ascending);
        assert_eq!(basket.visits()[0].logs, vec!["via view"]);
        assert_eq!(basket.options().get("seen"), Some(&serde_json::Value::Bool(true)));
    }
}
