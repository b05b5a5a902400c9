//! Error types for the Pulumi Cloud resource provider.
//!
//! This module provides the error hierarchy for every layer of the provider:
//! property decoding, identifier parsing, provider configuration, the REST
//! client, and the resource lifecycle itself.

use thiserror::Error;

use crate::property::PropertyMap;

/// The main error type for the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Property decoding errors.
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Composite identifier errors.
    #[error(transparent)]
    Id(#[from] IdError),

    /// Provider configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pulumi Cloud API errors that carry no extra operation context.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A remote call failed while performing an operation on a resource.
    #[error("{context}: {source}")]
    Operation {
        /// What was being attempted, e.g. `failed to read StackTag ("o/p/s/t")`.
        context: String,
        /// The underlying API error.
        #[source]
        source: ApiError,
    },

    /// The remote object was created but a dependent call failed afterwards.
    ///
    /// The identifier and the properties reached so far must still be
    /// recorded by the caller so the orphaned object can be destroyed later.
    #[error("resource {id} was created but failed to initialize: {}", reasons.join("; "))]
    ResourceInitFailed {
        /// Identifier of the object that now exists remotely.
        id: String,
        /// Output properties describing the partially initialized object.
        properties: PropertyMap,
        /// Why initialization did not complete.
        reasons: Vec<String>,
    },

    /// Update was invoked for a kind whose every field forces replacement.
    #[error("unexpected call to update {resource}, expected create to be called instead")]
    UnexpectedUpdate {
        /// Type token of the resource.
        resource: String,
    },

    /// No handler is registered for a type token.
    #[error("unknown resource type '{token}'")]
    UnknownResource {
        /// The unregistered type token.
        token: String,
    },

    /// Request or response serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while decoding a property map into a typed input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    /// A required key is absent or null.
    #[error("missing required property '{key}'")]
    Missing {
        /// The missing key.
        key: String,
    },

    /// A key holds a value of the wrong kind.
    #[error("property '{key}' must be {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// Human readable name of the expected kind.
        expected: &'static str,
    },

    /// A value has the right kind but cannot be interpreted.
    #[error("property '{key}' is invalid: {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// The wire encoding of a property value is malformed.
    #[error("malformed property encoding: {message}")]
    Malformed {
        /// Description of the encoding problem.
        message: String,
    },
}

/// Errors raised while decoding a composite identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The identifier does not have an accepted shape.
    #[error("{id:?} is invalid, must be in {expected} format")]
    InvalidFormat {
        /// The identifier that was rejected.
        id: String,
        /// The accepted format(s).
        expected: &'static str,
    },

    /// A team stack permission created by an older provider release.
    #[error(
        "TeamStackPermission resources created before v0.17.0 do not support refresh. \
         You will need to destroy and recreate this resource with >v0.17.0 to successfully refresh."
    )]
    LegacyTeamStackPermission,
}

/// Provider configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No access token in config, environment, or stored credentials.
    #[error("pulumi access token not found")]
    AccessTokenNotFound,

    /// The stored credentials file could not be parsed.
    #[error("failed to read stored credentials from {path}: {message}")]
    Credentials {
        /// Path of the credentials file.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Pulumi Cloud REST API errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("{status} API error: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the service.
        message: String,
    },

    /// The request never produced a response.
    #[error("Network error communicating with Pulumi Cloud: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The response body could not be understood.
    #[error("Invalid response from Pulumi Cloud: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The service rejected environment YAML.
    #[error("environment definition failed the following checks: {}", diagnostics.join("; "))]
    Diagnostics {
        /// One line per diagnostic.
        diagnostics: Vec<String>,
    },

    /// The request was rejected before being sent.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the rejected argument.
        message: String,
    },
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps an API error with the operation that was being attempted.
    #[must_use]
    pub fn operation(context: impl Into<String>, source: ApiError) -> Self {
        Self::Operation {
            context: context.into(),
            source,
        }
    }

    /// Creates an update contract violation for the given type token.
    #[must_use]
    pub fn unexpected_update(resource: impl Into<String>) -> Self {
        Self::UnexpectedUpdate {
            resource: resource.into(),
        }
    }

    /// Returns the allocated identifier if this is a partial failure.
    #[must_use]
    pub fn partial_id(&self) -> Option<&str> {
        match self {
            Self::ResourceInitFailed { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl PropertyError {
    /// Creates a missing-key error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Creates a wrong-type error.
    #[must_use]
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.into(),
            expected,
        }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-encoding error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl IdError {
    /// Creates an invalid-format error.
    #[must_use]
    pub fn invalid(id: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidFormat {
            id: id.into(),
            expected,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ApiError {
    /// Creates an API status error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates an invalid-request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code, if the service answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the service reported the object as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Returns true if the service reported a conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(409))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_matches_service_format() {
        let err = ApiError::api_error(404, "stack not found");
        assert_eq!(err.to_string(), "404 API error: stack not found");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = ApiError::network("connection reset");
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_operation_error_keeps_context() {
        let err = ProviderError::operation(
            "failed to read StackTag (\"o/p/s/t\")",
            ApiError::api_error(500, "boom"),
        );
        assert_eq!(
            err.to_string(),
            "failed to read StackTag (\"o/p/s/t\"): 500 API error: boom"
        );
    }

    #[test]
    fn test_partial_id_only_for_init_failures() {
        let err = ProviderError::ResourceInitFailed {
            id: "org/team".to_string(),
            properties: PropertyMap::new(),
            reasons: vec!["bob".to_string()],
        };
        assert_eq!(err.partial_id(), Some("org/team"));
        assert_eq!(ProviderError::internal("x").partial_id(), None);
    }

    #[test]
    fn test_id_error_names_expected_format() {
        let err = IdError::invalid("a/b", "organization/project/stack/tagName");
        assert_eq!(
            err.to_string(),
            "\"a/b\" is invalid, must be in organization/project/stack/tagName format"
        );
    }
}
