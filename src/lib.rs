//! Bundle Operator - dynamic-kind Kubernetes operator for image-packaged bundles
//!
//! The operator is configured with a declarative list of service definitions,
//! each naming a custom resource kind, a backing bundle image, and a
//! provisioning plan. On startup it resolves every definition into a validated
//! specification+plan pair, registers the kind for dynamic decoding, and builds
//! an immutable dispatch table that routes watch events to the resolved pair.
//!
//! # Startup sequence
//!
//! 1. Service definitions come from a config file or from CLI flags ([`config`])
//! 2. Each definition's bundle spec is fetched and its plan validated ([`spec`])
//! 3. Each definition's kind is registered for dynamic decoding ([`registry`])
//! 4. Resolved pairs fold into the dispatch table ([`dispatch`])
//! 5. Watches are established and the event loop starts ([`bootstrap`], [`runtime`])
//!
//! Any failure before the event loop aborts the whole process: the operator
//! never starts watching with an incompletely resolved configuration.
//!
//! # Modules
//!
//! - [`config`] - Service definition resolution from file or flags
//! - [`registry`] - Dynamic resource type registration (GVK handling)
//! - [`spec`] - Bundle specification fetching, parsing, and plan validation
//! - [`dispatch`] - Immutable dispatch table keyed by resource identity
//! - [`bootstrap`] - Startup orchestration and cluster defaults
//! - [`runtime`] - Watch establishment and the event loop
//! - [`handler`] - Reconcile handler interface
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod runtime;
pub mod spec;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default resync interval for watches, in seconds
pub const DEFAULT_RESYNC_SECS: u64 = 5;
