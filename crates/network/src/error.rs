//! Error types for network convergence.

use thiserror::Error;

use crate::key::{Key, ResourceKind};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while converging network resources.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The provider accepted the call but the operation finished with an error.
    #[error("Operation {operation} on {resource} failed: {message}")]
    Operation {
        resource: String,
        operation: String,
        message: String,
    },

    /// The operation did not reach a terminal state in time.
    #[error("Timed out after {secs}s waiting for operation on {resource}")]
    Timeout { resource: String, secs: u64 },

    /// The caller cancelled the invocation.
    #[error("Cancelled while working on {resource}")]
    Cancelled { resource: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A resource reference could not be parsed.
    #[error("Invalid resource reference '{reference}': {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: url::ParseError,
    },

    /// A provider call failed for a specific resource.
    #[error("failed to {action} {kind} {key}: {source}")]
    Resource {
        action: &'static str,
        kind: ResourceKind,
        key: Key,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether this error means the target resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::Api { status: 404, .. } => true,
            Self::Resource { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error is a wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Resource { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Whether this error came from cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Resource { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Whether an accepted operation later reported a failure.
    #[must_use]
    pub fn is_operation_failure(&self) -> bool {
        match self {
            Self::Operation { .. } => true,
            Self::Resource { source, .. } => source.is_operation_failure(),
            _ => false,
        }
    }

    /// Attach the identity of the resource a call was made for.
    ///
    /// Wait outcomes and configuration errors already name their resource
    /// and are returned unchanged.
    #[must_use]
    pub fn for_resource(self, action: &'static str, kind: ResourceKind, key: &Key) -> Self {
        match self {
            Self::Operation { .. }
            | Self::Timeout { .. }
            | Self::Cancelled { .. }
            | Self::Config(_)
            | Self::Resource { .. } => self,
            other => Self::Resource {
                action,
                kind,
                key: key.clone(),
                source: Box::new(other),
            },
        }
    }
}

/// Helpers for results of provider calls.
pub trait ResultExt<T> {
    /// Map `NotFound` to `Ok(None)`.
    ///
    /// # Errors
    /// Returns any error other than `NotFound`.
    fn found(self) -> Result<Option<T>>;

    /// Wrap the error with the resource it concerns.
    ///
    /// # Errors
    /// Returns the wrapped error.
    fn for_resource(self, action: &'static str, kind: ResourceKind, key: &Key) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn found(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn for_resource(self, action: &'static str, kind: ResourceKind, key: &Key) -> Result<T> {
        self.map_err(|e| e.for_resource(action, kind, key))
    }
}
