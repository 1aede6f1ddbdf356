//! Error types for Lode.
//!
//! [`LodeError`] is the single failure type flowing out of stations,
//! terminals, shafts and mines. Hooks return it as an ordinary `Err`; the
//! shaft short-circuits on the first one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias using [`LodeError`].
pub type LodeResult<T> = Result<T, LodeError>;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or incomplete input rejected before the terminal ran.
    Validation,
    /// Credentials missing or unusable.
    Authentication,
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// The terminal could not find what it was asked for.
    NotFound,
    /// The terminal's own work failed.
    Terminal,
    /// A collaborator behind the terminal failed.
    External,
    /// No shaft accepts the request type.
    Routing,
    /// Registration-time or engine-contract violations.
    Internal,
}

impl ErrorCategory {
    /// Returns the snake_case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Terminal => "terminal",
            Self::External => "external",
            Self::Routing => "routing",
            Self::Internal => "internal",
        }
    }
}

/// Standard error type for Lode.
///
/// # Example
///
/// ```
/// use lode_core::{ErrorCategory, LodeError};
///
/// fn check(name: &str) -> Result<(), LodeError> {
///     if name.is_empty() {
///         return Err(LodeError::validation("name cannot be empty"));
///     }
///     Ok(())
/// }
///
/// assert_eq!(check("").unwrap_err().category(), ErrorCategory::Validation);
/// ```
#[derive(Error, Debug)]
pub enum LodeError {
    /// Request validation failed.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field-specific validation errors.
        #[source]
        field_errors: Option<FieldErrors>,
    },

    /// Credentials were required but missing or unusable.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("Authorization denied: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
        /// The request kind that was denied.
        kind: Option<String>,
    },

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The terminal's work failed.
    #[error("Terminal error: {message}")]
    Terminal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A collaborator called by the terminal failed.
    #[error("External service error: {message}")]
    External {
        /// Human-readable error message.
        message: String,
        /// The name of the external service.
        service: Option<String>,
    },

    /// No shaft is registered for the request type.
    #[error("Routing error for {kind}: {message}")]
    Routing {
        /// The request kind that could not be routed.
        kind: String,
        /// Human-readable error message.
        message: String,
    },

    /// A shaft was registered twice for the same request type.
    #[error("Duplicate shaft for {kind} in mine '{mine}'")]
    DuplicateShaft {
        /// The request kind registered twice.
        kind: String,
        /// The mine (or registry) that rejected the registration.
        mine: String,
    },

    /// A response was attached to a basket whose request it does not answer.
    #[error("Correlation mismatch: response for {actual} assigned to request {expected}")]
    Correlation {
        /// Request ID of the basket.
        expected: String,
        /// Request ID carried by the response.
        actual: String,
    },

    /// The terminal completed without attaching a response.
    #[error("Terminal '{terminal}' completed without a response")]
    MissingResponse {
        /// Name of the terminal.
        terminal: String,
    },

    /// An ascend hook failed after the response existed.
    #[error("Ascend failed at station '{station}': {source}")]
    Ascend {
        /// Name of the station whose ascend hook failed.
        station: String,
        /// The error returned by the hook.
        #[source]
        source: Box<LodeError>,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl LodeError {
    /// Creates a validation error with a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Creates a validation error with field-specific errors.
    #[must_use]
    pub fn validation_with_fields(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            kind: None,
        }
    }

    /// Creates an authorization error naming the denied request kind.
    #[must_use]
    pub fn authorization_for_kind(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            kind: Some(kind.into()),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a terminal error.
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a terminal error wrapping the failure of an external call.
    pub fn terminal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Terminal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an external service error.
    #[must_use]
    pub fn external(message: impl Into<String>, service: Option<impl Into<String>>) -> Self {
        Self::External {
            message: message.into(),
            service: service.map(Into::into),
        }
    }

    /// Creates a routing error.
    #[must_use]
    pub fn routing(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Routing {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a duplicate registration error.
    #[must_use]
    pub fn duplicate_shaft(kind: impl Into<String>, mine: impl Into<String>) -> Self {
        Self::DuplicateShaft {
            kind: kind.into(),
            mine: mine.into(),
        }
    }

    /// Creates a missing-response error.
    #[must_use]
    pub fn missing_response(terminal: impl Into<String>) -> Self {
        Self::MissingResponse {
            terminal: terminal.into(),
        }
    }

    /// Wraps a failure raised by a station's ascend hook.
    #[must_use]
    pub fn ascend(station: impl Into<String>, source: LodeError) -> Self {
        Self::Ascend {
            station: station.into(),
            source: Box::new(source),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    ///
    /// Ascend failures report the category of the wrapped error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Terminal { .. } | Self::MissingResponse { .. } => ErrorCategory::Terminal,
            Self::External { .. } => ErrorCategory::External,
            Self::Routing { .. } => ErrorCategory::Routing,
            Self::DuplicateShaft { .. } | Self::Correlation { .. } | Self::Internal { .. } => {
                ErrorCategory::Internal
            }
            Self::Ascend { source, .. } => source.category(),
        }
    }

    /// Returns `true` if this failure happened during the ascend phase.
    #[must_use]
    pub const fn is_ascend(&self) -> bool {
        matches!(self, Self::Ascend { .. })
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Authorization { .. } => "AUTHORIZATION_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Terminal { .. } => "TERMINAL_ERROR",
            Self::External { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Routing { .. } => "ROUTING_ERROR",
            Self::DuplicateShaft { .. } => "DUPLICATE_SHAFT",
            Self::Correlation { .. } => "CORRELATION_MISMATCH",
            Self::MissingResponse { .. } => "MISSING_RESPONSE",
            Self::Ascend { .. } => "ASCEND_FAILED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation {
                field_errors: Some(errors),
                ..
            } => serde_json::to_value(errors).ok(),
            Self::Authorization {
                kind: Some(kind), ..
            }
            | Self::Routing { kind, .. } => Some(serde_json::json!({ "kind": kind })),
            Self::External {
                service: Some(service),
                ..
            } => Some(serde_json::json!({ "service": service })),
            Self::Ascend { station, source } => Some(serde_json::json!({
                "station": station,
                "cause": source.error_code(),
            })),
            _ => None,
        }
    }
}

/// Field-specific validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Error)]
#[error("Field validation errors")]
pub struct FieldErrors {
    /// Map of field path to list of error messages.
    pub fields: HashMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Creates a new empty `FieldErrors`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns `true` if there are no field errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Serializable error envelope handed to boundary collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = LodeError::validation("Invalid email format");
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(error.to_string().contains("Invalid email format"));
    }

    #[test]
    fn test_validation_error_with_fields() {
        let mut field_errors = FieldErrors::new();
        field_errors.add("email", "Invalid format");
        field_errors.add("email", "Must not be empty");
        field_errors.add("name", "Too long");

        let error = LodeError::validation_with_fields("Validation failed", field_errors);
        let envelope = error.to_envelope(Some("req-123"));
        let details = envelope.error.details.expect("details present");
        assert_eq!(details["fields"]["email"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_ascend_reports_inner_category() {
        let error = LodeError::ascend("reverse", LodeError::validation("bad greeting"));
        assert!(error.is_ascend());
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert_eq!(error.error_code(), "ASCEND_FAILED");
        assert!(error.to_string().contains("reverse"));
    }

    #[test]
    fn test_routing_error_envelope() {
        let error = LodeError::routing("GetInvoice", "no shaft registered");
        let envelope = error.to_envelope(Some("req-456"));

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":\"ROUTING_ERROR\""));
        assert!(json.contains("\"request_id\":\"req-456\""));
        assert!(json.contains("\"category\":\"routing\""));
        assert!(json.contains("GetInvoice"));
    }

    #[test]
    fn test_terminal_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "store down");
        let error = LodeError::terminal_with_source("store unavailable", io);
        assert_eq!(error.category(), ErrorCategory::Terminal);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(ErrorCategory::NotFound.as_str(), "not_found");
        let json = serde_json::to_string(&ErrorCategory::NotFound).expect("should serialize");
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn test_field_errors() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.add("email", "Invalid format");
        assert_eq!(errors.len(), 1);

        errors.add("email", "Required");
        assert_eq!(errors.fields["email"].len(), 2);
    }
}
