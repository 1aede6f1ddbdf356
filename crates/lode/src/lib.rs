//! # Lode
//!
//! **Typed bidirectional pipeline engine**
//!
//! A request is wrapped in a [`Basket`](prelude::Basket), carried down a
//! [`Shaft`](prelude::Shaft) of stations to a terminal that produces the
//! response, and carried back up through the same stations in reverse.
//! Every station and the terminal leave a visit on the basket, so a
//! finished basket is its own trace.
//!
//! - **Shafts** are grouped into mines and looked up by request type
//! - **Nested calls** from inside a traversal get their own basket, linked
//!   to the caller as its parent
//! - **Envelopes** of tag plus JSON payload are routed to typed requests
//!
//! ## Architecture
//!
//! ```text
//! Basket → Access → Validation → … → Terminal
//!                                       ↓
//! Basket ← Access ← Validation ← … ←────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use lode::prelude::*;
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
//! struct Greeter;
//!
//! impl Terminal<Greet> for Greeter {
//!     fn produce<'a>(&'a self, basket: &'a mut Basket<Greet>) -> BoxFuture<'a, LodeResult<()>> {
//!         Box::pin(async move {
//!             let reply = Reply::ok(basket.request().id, format!("hello {}", basket.request().name));
//!             basket.set_response(reply)
//!         })
//!     }
//! }
//!
//! let mut mine = Mine::new("greetings");
//! let shaft = mine.shaft_builder::<Greet>().terminal(Greeter).build().unwrap();
//! mine.add_shaft(shaft).unwrap();
//! let registry = MineRegistry::builder().mine(mine).build().unwrap();
//! assert!(registry.handles::<Greet>());
//! ```

#![doc(html_root_url = "https://docs.rs/lode/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use lode_core as core;

// Re-export the execution engine
pub use lode_shaft as shaft;

// Re-export mines, the registry and the router
pub use lode_mine as mine;

// Re-export observability
pub use lode_telemetry as telemetry;

// Re-export configuration
pub use lode_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use lode::prelude::*;
/// ```
pub mod prelude {
    pub use lode_core::{
        Basket, BasketView, BoxFuture, Direction, ErrorCategory, Fanout, LodeError,
        LodeExporters, LodeResult, LogExporter, Options, ParentLink, Reply, Request, RequestId,
        Response, Trace, Visit, ACCESS_TOKEN,
    };

    pub use lode_shaft::stations::{AccessStation, ValidationStation};
    pub use lode_shaft::{AnyStation, FnTerminal, Shaft, ShaftSettings, Station, Terminal};

    pub use lode_mine::{
        Applies, Envelope, Mine, MineRegistry, Registrar, RegistryBuilder, RouterReply,
        TypeRouter, WithinExt,
    };

    pub use lode_telemetry::{JsonTraceExporter, MetricsExporter, TimingStation};

    pub use lode_config::{ConfigLoader, LodeConfig};
}
