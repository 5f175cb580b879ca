//! Error types for access control evaluation
//!
//! The core never fails on its own: unknown roles and resources simply match
//! no rule. Errors come from collaborators (assertions, external parent
//! backends, role stores) and from loading configuration.

use thiserror::Error;

/// Access control error types.
#[derive(Debug, Error)]
pub enum HrbacError {
    /// An assertion predicate raised an error instead of returning a verdict
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// An external parent backend could not resolve the parents of an entity
    #[error("Parent lookup failed for {kind} '{id}': {message}")]
    ParentLookup {
        /// Entity kind ("role" or "resource").
        kind: &'static str,
        /// Id whose parents were requested.
        id: String,
        /// Backend error message.
        message: String,
    },

    /// No role is currently set in the role store
    #[error("No current role")]
    NoCurrentRole,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for access control operations.
pub type HrbacResult<T> = Result<T, HrbacError>;

impl HrbacError {
    /// Build an [`HrbacError::AssertionFailed`] from any message.
    pub fn assertion(message: impl Into<String>) -> Self {
        HrbacError::AssertionFailed(message.into())
    }

    /// Build an [`HrbacError::ParentLookup`] for a failed backend call.
    pub fn parent_lookup(kind: &'static str, id: impl Into<String>, message: impl Into<String>) -> Self {
        HrbacError::ParentLookup {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Check if this error was raised by caller-supplied code.
    ///
    /// Collaborator errors surface from `is_allowed` unchanged and must be
    /// handled by the caller; they are never turned into a deny.
    pub fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            HrbacError::AssertionFailed(_) | HrbacError::ParentLookup { .. } | HrbacError::NoCurrentRole
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            HrbacError::AssertionFailed(_) => "ASSERTION_FAILED",
            HrbacError::ParentLookup { .. } => "PARENT_LOOKUP_FAILED",
            HrbacError::NoCurrentRole => "NO_CURRENT_ROLE",
            HrbacError::ConfigError(_) => "CONFIG_ERROR",
            HrbacError::Serialization(_) => "SERIALIZATION_ERROR",
            HrbacError::Io(_) => "IO_ERROR",
        }
    }
}
