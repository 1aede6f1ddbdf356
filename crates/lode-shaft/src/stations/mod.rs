//! Built-in stations.
//!
//! | Station               | Scope        | Purpose                                  |
//! |-----------------------|--------------|------------------------------------------|
//! | [`AccessStation`]     | any request  | Token/kind access control                |
//! | [`ValidationStation`] | one request  | Field rules checked before the terminal  |

pub mod access;
pub mod validation;

pub use access::{AccessDecision, AccessResult, AccessStation, GrantBuilder, TokenPolicy};
pub use validation::ValidationStation;
