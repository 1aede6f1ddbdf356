//! Request validation station.
//!
//! Runs a list of field rules against the request on the way down. Every
//! rule is checked, so the resulting error lists all offending fields at
//! once rather than the first one.
//!
//! # Example
//!
//! ```
//! use lode_core::{Options, Reply, Request, RequestId};
//! use lode_shaft::stations::ValidationStation;
//!
//! struct CreateUser {
//!     id: RequestId,
//!     options: Options,
//!     email: String,
//!     age: u32,
//! }
//!
//! impl Request for CreateUser {
//!     type Response = Reply<String>;
//!     fn id(&self) -> RequestId { self.id }
//!     fn options(&self) -> &Options { &self.options }
//! }
//!
//! let station = ValidationStation::<CreateUser>::new()
//!     .require("email", |r| r.email.as_str())
//!     .rule("age", "must be at least 18", |r| r.age >= 18);
//! assert_eq!(station.rule_count(), 2);
//! ```

use crate::station::Station;
use lode_core::{Basket, BoxFuture, FieldErrors, LodeError, LodeResult, Request};

type Check<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

struct Rule<R> {
    field: String,
    message: String,
    check: Check<R>,
}

/// Station that rejects requests failing any of its rules.
pub struct ValidationStation<R> {
    rules: Vec<Rule<R>>,
}

impl<R: Request> ValidationStation<R> {
    /// Creates a station with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Requires the string returned by `accessor` to be non-blank.
    pub fn require<F>(self, field: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> &str + Send + Sync + 'static,
    {
        self.rule(field, "is required", move |request| {
            !accessor(request).trim().is_empty()
        })
    }

    /// Adds a rule; `predicate` returns `true` for valid requests.
    pub fn rule<F>(mut self, field: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field: field.into(),
            message: message.into(),
            check: Box::new(predicate),
        });
        self
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Checks every rule against `request`.
    ///
    /// # Errors
    ///
    /// Returns the messages of all failing rules, keyed by field.
    pub fn check(&self, request: &R) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for rule in &self.rules {
            if !(rule.check)(request) {
                errors.add(rule.field.as_str(), rule.message.as_str());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<R: Request> Default for ValidationStation<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for ValidationStation<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.rules.iter().map(|r| r.field.as_str()).collect();
        f.debug_struct("ValidationStation")
            .field("fields", &fields)
            .finish()
    }
}

impl<R: Request> Station<R> for ValidationStation<R> {
    fn name(&self) -> &str {
        "validation"
    }

    fn descend<'a>(&'a self, basket: &'a mut Basket<R>) -> BoxFuture<'a, LodeResult<()>> {
        Box::pin(async move {
            match self.check(basket.request()) {
                Ok(()) => Ok(()),
                Err(errors) => {
                    basket.log(format!("{} field(s) rejected", errors.len()));
                    Err(LodeError::validation_with_fields(
                        format!("{} failed validation", R::kind()),
                        errors,
                    ))
                }
            }
        })
    }
}
