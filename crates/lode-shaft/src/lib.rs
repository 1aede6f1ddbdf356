//! # Lode Shaft
//!
//! Station chains and the shaft execution engine.
//!
//! A [`Shaft`] runs a basket down through its [`Station`]s, hands it to its
//! [`Terminal`], then runs it back up through the same stations in reverse:
//!
//! ```text
//! Basket → Station 0 → Station 1 → … → Terminal
//!                                          ↓
//! Basket ← Station 0 ← Station 1 ← … ←─────┘
//! ```
//!
//! ## Key Features
//!
//! - **Ordered**: descend hooks run 0..N, ascend hooks N..0
//! - **Halting**: the first failure stops the traversal; nothing after it runs
//! - **Traced**: every traversal is recorded as a visit on the basket
//! - **Shared**: stations and terminals serve concurrent baskets; call state
//!   lives in the basket
//!
//! ## Example
//!
//! ```
//! use lode_shaft::stations::AccessStation;
//! use lode_shaft::AnyStation;
//!
//! let access = AccessStation::allow_all();
//! assert_eq!(AnyStation::name(&access), "access");
//! ```

#![doc(html_root_url = "https://docs.rs/lode-shaft/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod shaft;
pub mod station;
pub mod stations;
pub mod terminal;

pub use shaft::{Shaft, ShaftBuilder, ShaftSettings, SharedStation};
pub use station::{AnyStation, Broad, Station};
pub use terminal::{FnTerminal, Terminal};
