//! Type-based router for untyped request envelopes.
//!
//! Boundary adapters (an HTTP controller, a queue consumer) receive a tag
//! and a JSON payload. The [`TypeRouter`] maps the tag to a registered
//! request type, deserializes the payload into it, and dispatches it
//! through the [`MineRegistry`]. Tags are registered explicitly at startup;
//! no type discovery happens at run time.
//!
//! # Example
//!
//! ```
//! use lode_mine::{Envelope, MineRegistry, TypeRouter};
//!
//! let registry = MineRegistry::builder().build().unwrap();
//! let router = TypeRouter::new(registry);
//! assert!(router.tags().is_empty());
//!
//! let envelope: Envelope = serde_json::from_str(r#"{"kind":"Add","payload":{"a":1}}"#).unwrap();
//! assert_eq!(envelope.kind, "Add");
//! ```

use crate::registry::MineRegistry;
use lode_core::{Basket, BoxFuture, ErrorEnvelope, LodeError, LodeResult, Options, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An untyped request: a kind tag plus its JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Tag naming the request type.
    pub kind: String,
    /// Request body, deserialized into the tagged type.
    #[serde(default)]
    pub payload: Value,
    /// Options merged into the basket options.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// Caller-side correlation ID echoed in error replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Envelope {
    /// Creates an envelope with no options.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            options: Options::new(),
            correlation_id: None,
        }
    }

    /// Adds an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Sets the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Result of [`TypeRouter::dispatch_reply`], ready to serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouterReply {
    /// The request succeeded.
    Success {
        /// Kind tag of the request.
        kind: String,
        /// Serialized response.
        value: Value,
    },
    /// The request failed.
    Failure(ErrorEnvelope),
}

impl RouterReply {
    /// Returns `true` for a success reply.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

type Route = Arc<dyn Fn(Envelope, MineRegistry) -> BoxFuture<'static, LodeResult<Value>> + Send + Sync>;

/// Maps kind tags to deserialize-and-dispatch routes.
#[derive(Clone)]
pub struct TypeRouter {
    registry: MineRegistry,
    routes: HashMap<String, Route>,
}

impl TypeRouter {
    /// Creates a router dispatching through `registry`.
    pub fn new(registry: MineRegistry) -> Self {
        Self {
            registry,
            routes: HashMap::new(),
        }
    }

    /// Routes the tag `R::kind()` to `R`.
    ///
    /// # Errors
    ///
    /// See [`TypeRouter::route_as`].
    pub fn route<R>(self) -> LodeResult<Self>
    where
        R: Request + DeserializeOwned,
        R::Response: Serialize,
    {
        self.route_as::<R>(R::kind())
    }

    /// Routes `tag` to `R`.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Internal`] if `tag` is already routed, or
    /// [`LodeError::Routing`] if the registry cannot serve `R`.
    pub fn route_as<R>(mut self, tag: impl Into<String>) -> LodeResult<Self>
    where
        R: Request + DeserializeOwned,
        R::Response: Serialize,
    {
        let tag = tag.into();
        if self.routes.contains_key(&tag) {
            return Err(LodeError::internal(format!("tag '{tag}' is already routed")));
        }
        if !self.registry.handles::<R>() {
            return Err(LodeError::routing(
                R::kind(),
                format!("cannot route '{tag}': no mine serves this request type"),
            ));
        }

        let route: Route = Arc::new(|envelope: Envelope, registry: MineRegistry| {
            Box::pin(async move {
                let request: R = match serde_json::from_value(envelope.payload) {
                    Ok(request) => request,
                    Err(e) => {
                        let error =
                            LodeError::validation(format!("malformed {} payload: {e}", envelope.kind));
                        registry.report(&error);
                        return Err(error);
                    }
                };
                let mut basket = Basket::new(request);
                basket.options_mut().extend(envelope.options);

                let response = registry.send(basket).await?.into_response()?;
                serde_json::to_value(&response)
                    .map_err(|e| LodeError::internal_with_source("response serialization failed", e))
            }) as BoxFuture<'static, LodeResult<Value>>
        });

        tracing::debug!(tag = %tag, kind = R::kind(), "route registered");
        self.routes.insert(tag, route);
        Ok(self)
    }

    /// Dispatches an envelope and returns the serialized response.
    ///
    /// # Errors
    ///
    /// Returns [`LodeError::Routing`] for an unknown tag,
    /// [`LodeError::Validation`] for a payload that does not deserialize,
    /// otherwise whatever the shaft returns.
    pub async fn dispatch(&self, envelope: Envelope) -> LodeResult<Value> {
        let Some(route) = self.routes.get(&envelope.kind) else {
            let error = LodeError::routing(envelope.kind.as_str(), "unknown request kind");
            self.registry.report(&error);
            return Err(error);
        };
        route(envelope, self.registry.clone()).await
    }

    /// Dispatches an envelope, turning failures into an error envelope.
    pub async fn dispatch_reply(&self, envelope: Envelope) -> RouterReply {
        let kind = envelope.kind.clone();
        let correlation_id = envelope.correlation_id.clone();
        match self.dispatch(envelope).await {
            Ok(value) => RouterReply::Success { kind, value },
            Err(error) => RouterReply::Failure(error.to_envelope(correlation_id.as_deref())),
        }
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for TypeRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRouter")
            .field("tags", &self.tags())
            .finish_non_exhaustive()
    }
}
