//! # Lode Mine
//!
//! Dispatch by request type.
//!
//! - [`Mine`] - Named table of shafts keyed by request type, plus common
//!   stations shared between them
//! - [`MineRegistry`] - Read-only process registry of mines
//! - [`Registrar`] - Startup hook that wires capabilities into a registry
//! - [`Within`] - Nested calls from inside a running traversal
//! - [`TypeRouter`] - Tag-and-payload envelopes to typed requests
//!
//! ## Nested Calls
//!
//! ```text
//! registry.send(A) ─► shaft A ─► terminal A ─► basket.within().send(B)
//!                                                   │
//!                                  registry.send(B) ─► shaft B (parent = A)
//! ```
//!
//! The child basket carries a [`ParentLink`](lode_core::ParentLink) to its
//! parent and is traced on its own.

#![doc(html_root_url = "https://docs.rs/lode-mine/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod mine;
mod registry;
mod router;
mod within;

pub use mine::{Applies, Mine};
pub use registry::{MineRegistry, Registrar, RegistryBuilder};
pub use router::{Envelope, RouterReply, TypeRouter};
pub use within::{Within, WithinExt};
