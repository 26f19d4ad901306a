//! Error types for the Bundle Operator
//!
//! Every error raised during startup is unrecoverable at this layer: it
//! propagates up to `main`, which alone decides process termination and exit
//! status. No component terminates the process itself.

use thiserror::Error;

/// Exit status used when a requested plan is absent from its specification
pub const PLAN_NOT_FOUND_EXIT_CODE: i32 = 2;

/// Main error type for Bundle Operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Unreadable, unparsable, or undecodable configuration
    #[error("config error: {0}")]
    Config(String),

    /// The watch namespace could not be resolved from the environment
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Malformed apiVersion that cannot be split into group and version
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The requested plan is absent from the resolved specification
    #[error("plan {plan:?} not found in specification {spec:?}")]
    PlanNotFound {
        /// Name of the plan that was requested
        plan: String,
        /// Name of the specification that was searched
        spec: String,
    },

    /// Two definitions resolved to the same dispatch key
    #[error("duplicate dispatch key: {0}")]
    DuplicateKey(String),

    /// Bundle specification document could not be fetched
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a namespace error with the given message
    pub fn namespace(msg: impl Into<String>) -> Self {
        Self::Namespace(msg.into())
    }

    /// Create an invalid identifier error with the given message
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    /// Create a fetch error with the given message
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// A missing plan gets a distinct status so callers can tell a resolution
    /// failure from the other fatal startup errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PlanNotFound { .. } => PLAN_NOT_FOUND_EXIT_CODE,
            _ => 1,
        }
    }
}
