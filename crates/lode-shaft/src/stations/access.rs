//! Access control station.
//!
//! Checks the `access_token` option of each basket against a policy before
//! anything else in the chain runs. Works with every request type, keyed by
//! the request kind.
//!
//! # Modes
//!
//! - Allow-all (development and tests)
//! - Deny-all (rejection flows)
//! - Token grants: each token may call a set of kinds, `"*"` for all
//! - Custom [`TokenPolicy`]
//!
//! # Example
//!
//! ```
//! use lode_shaft::stations::AccessStation;
//!
//! let open = AccessStation::allow_all();
//! let closed = AccessStation::deny_all();
//!
//! let grants = AccessStation::grants()
//!     .grant("admin-token", ["*"])
//!     .grant("reader-token", ["GetUser", "ListUsers"])
//!     .allow_anonymous_kinds(["Health"])
//!     .build();
//! ```

use crate::station::AnyStation;
use lode_core::{BasketView, BoxFuture, LodeError, LodeResult, ACCESS_TOKEN};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Station that authorizes baskets by access token and request kind.
#[derive(Debug, Clone)]
pub struct AccessStation {
    mode: AccessMode,
}

#[derive(Debug, Clone)]
enum AccessMode {
    AllowAll,
    DenyAll,
    Grants(Arc<GrantTable>),
    Custom(Arc<dyn TokenPolicy>),
}

#[derive(Debug, Default)]
struct GrantTable {
    /// Token to permitted kinds; `"*"` permits every kind.
    grants: HashMap<String, HashSet<String>>,
    anonymous_kinds: HashSet<String>,
    allow_anonymous: bool,
}

/// Custom access policy.
pub trait TokenPolicy: Send + Sync + std::fmt::Debug + 'static {
    /// Decides whether `token` (if any) may call `kind`.
    fn evaluate(&self, token: Option<&str>, kind: &str) -> AccessDecision;
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The call may proceed.
    Allow,
    /// Credentials are missing or unusable.
    Challenge {
        /// Why the credentials were refused.
        reason: String,
    },
    /// The caller is known but not permitted.
    Deny {
        /// Why the call was denied.
        reason: String,
    },
}

/// Outcome stored in the basket extensions for later stations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessResult {
    /// Whether the call was allowed.
    pub allowed: bool,
    /// The request kind that was evaluated.
    pub kind: String,
    /// Refusal reason, if not allowed.
    pub reason: Option<String>,
}

impl AccessStation {
    /// Allows every call.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            mode: AccessMode::AllowAll,
        }
    }

    /// Denies every call.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            mode: AccessMode::DenyAll,
        }
    }

    /// Starts a token-grant policy.
    #[must_use]
    pub fn grants() -> GrantBuilder {
        GrantBuilder::default()
    }

    /// Uses a custom policy.
    #[must_use]
    pub fn custom<P: TokenPolicy>(policy: P) -> Self {
        Self {
            mode: AccessMode::Custom(Arc::new(policy)),
        }
    }

    /// Evaluates the policy for a token and request kind.
    pub fn evaluate(&self, token: Option<&str>, kind: &str) -> AccessDecision {
        match &self.mode {
            AccessMode::AllowAll => AccessDecision::Allow,
            AccessMode::DenyAll => AccessDecision::Deny {
                reason: "access denied (deny-all mode)".to_string(),
            },
            AccessMode::Grants(table) => Self::evaluate_grants(table, token, kind),
            AccessMode::Custom(policy) => policy.evaluate(token, kind),
        }
    }

    fn evaluate_grants(table: &GrantTable, token: Option<&str>, kind: &str) -> AccessDecision {
        let Some(token) = token else {
            if table.allow_anonymous || table.anonymous_kinds.contains(kind) {
                return AccessDecision::Allow;
            }
            return AccessDecision::Challenge {
                reason: format!("access token required for {kind}"),
            };
        };

        match table.grants.get(token) {
            None => AccessDecision::Challenge {
                reason: "access token not recognized".to_string(),
            },
            Some(kinds) if kinds.contains("*") || kinds.contains(kind) => AccessDecision::Allow,
            Some(_) => AccessDecision::Deny {
                reason: format!("token has no grant for {kind}"),
            },
        }
    }
}

impl AnyStation for AccessStation {
    fn name(&self) -> &str {
        "access"
    }

    fn descend<'a>(&'a self, basket: &'a mut dyn BasketView) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            let kind = basket.kind();
            let decision = self.evaluate(basket.options().get_str(ACCESS_TOKEN), kind);

            let (allowed, reason) = match &decision {
                AccessDecision::Allow => (true, None),
                AccessDecision::Challenge { reason } | AccessDecision::Deny { reason } => {
                    (false, Some(reason.clone()))
                }
            };
            basket.extensions_mut().insert(AccessResult {
                allowed,
                kind: kind.to_string(),
                reason,
            });

            match decision {
                AccessDecision::Allow => {
                    basket.log_message("access granted".to_string());
                    Ok(())
                }
                AccessDecision::Challenge { reason } => {
                    basket.log_message(format!("access challenged: {reason}"));
                    Err(LodeError::authentication(reason))
                }
                AccessDecision::Deny { reason } => {
                    basket.log_message(format!("access denied: {reason}"));
                    Err(LodeError::authorization_for_kind(reason, kind))
                }
            }
        })
    }
}

/// Builder for a token-grant [`AccessStation`].
#[derive(Debug, Default)]
pub struct GrantBuilder {
    table: GrantTable,
}

impl GrantBuilder {
    /// Lets `token` call the given kinds. Use `["*"]` for every kind.
    #[must_use]
    pub fn grant<S, I>(mut self, token: S, kinds: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.table
            .grants
            .entry(token.into())
            .or_default()
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Lets callers without a token call the given kinds.
    #[must_use]
    pub fn allow_anonymous_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.table
            .anonymous_kinds
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Lets callers without a token call every kind.
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.table.allow_anonymous = true;
        self
    }

    /// Builds the station.
    #[must_use]
    pub fn build(self) -> AccessStation {
        AccessStation {
            mode: AccessMode::Grants(Arc::new(self.table)),
        }
    }
}
