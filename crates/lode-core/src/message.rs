//! Request and response contracts.
//!
//! A request type names its response type, so a [`Basket`](crate::Basket)
//! can only ever hold the response that belongs to its request.

use crate::{Options, RequestId};
use serde::{Deserialize, Serialize};

/// A typed request that can travel through a shaft.
///
/// # Example
///
/// ```
/// use lode_core::{Options, Reply, Request, RequestId};
///
/// struct Double {
///     id: RequestId,
///     options: Options,
///     value: i64,
/// }
///
/// impl Request for Double {
///     type Response = Reply<i64>;
///
///     fn id(&self) -> RequestId {
///         self.id
///     }
///
///     fn options(&self) -> &Options {
///         &self.options
///     }
/// }
///
/// assert_eq!(Double::kind(), "Double");
/// ```
pub trait Request: Send + Sync + 'static {
    /// The response produced for this request.
    type Response: Response;

    /// Correlation identifier, assigned when the request was constructed.
    fn id(&self) -> RequestId;

    /// Cross-cutting options supplied with the request.
    fn options(&self) -> &Options;

    /// Stable tag naming this request type.
    ///
    /// Defaults to the unqualified type name. Override it when the tag is
    /// part of an external contract (for example a router envelope).
    fn kind() -> &'static str
    where
        Self: Sized,
    {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// A response correlated to the request that produced it.
pub trait Response: Send + Sync + 'static {
    /// Identifier of the originating request.
    fn request_id(&self) -> RequestId;

    /// Error indicator carried alongside (or instead of) result data.
    fn error(&self) -> Option<&str> {
        None
    }
}

/// General-purpose response carrying an optional value and error message.
///
/// # Example
///
/// ```
/// use lode_core::{Reply, RequestId, Response};
///
/// let id = RequestId::new();
/// let reply = Reply::ok(id, 10);
/// assert_eq!(reply.request_id(), id);
/// assert_eq!(reply.value, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    /// Identifier of the originating request.
    pub request_id: RequestId,
    /// Result data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    /// Error message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Reply<T> {
    /// A successful reply carrying `value`.
    pub fn ok(request_id: RequestId, value: T) -> Self {
        Self {
            request_id,
            value: Some(value),
            error: None,
        }
    }

    /// A reply that reports an error instead of data.
    pub fn failed(request_id: RequestId, error: impl Into<String>) -> Self {
        Self {
            request_id,
            value: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Send + Sync + 'static> Response for Reply<T> {
    fn request_id(&self) -> RequestId {
        self.request_id
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Strips the module path and generic arguments from a type name.
///
/// `my_app::ops::GetUser<alloc::string::String>` becomes `GetUser`.
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
