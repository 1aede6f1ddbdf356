//! # Lode Core
//!
//! Core types and contracts for the Lode pipeline engine.
//!
//! This crate provides the foundational types shared by every other Lode crate:
//!
//! - [`Request`] / [`Response`] - Typed, correlated messages
//! - [`Basket`] - Per-call context carrying request, response, visits and options
//! - [`Visit`] - One entry in a basket's traversal log
//! - [`LodeError`] - Standard error type
//! - [`TraceExporter`] / [`ErrorExporter`] - Observability sinks

#![doc(html_root_url = "https://docs.rs/lode-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod basket;
mod error;
mod export;
mod extensions;
mod ids;
mod message;
mod options;
mod visit;

use std::future::Future;
use std::pin::Pin;

pub use basket::{Basket, BasketView, ParentLink, Trace};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, FieldErrors, LodeError, LodeResult};
pub use export::{
    ErrorExporter, Fanout, LodeExporters, LogExporter, NoopExporter, TraceExporter,
};
pub use extensions::Extensions;
pub use ids::{BasketId, RequestId};
pub use message::{short_type_name, Reply, Request, Response};
pub use options::{Options, ACCESS_TOKEN};
pub use visit::{Direction, Visit};

/// A boxed future, used for the async hooks of stations and terminals.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
