//! Startup orchestration
//!
//! The bootstrapper runs the fixed startup sequence: resolve the watch
//! namespace, construct the process-wide cluster defaults, resolve and
//! register every service definition, establish the watches, and hand the
//! finalized dispatch table to the event loop. Startup is strictly sequential;
//! any failure aborts before the event loop is entered.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::ServiceDefinition;
use crate::dispatch::DispatchTableBuilder;
use crate::registry::TypeRegistry;
use crate::runtime::WatchRuntime;
use crate::spec::{resolve_spec, SpecFetcher};
use crate::{Error, Result};

/// Environment variable naming the namespace to watch
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

/// Image pull policy applied to bundle sandboxes
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    /// Always pull the bundle image
    #[default]
    Always,
    /// Pull only when the image is absent
    IfNotPresent,
    /// Never pull
    Never,
}

impl std::fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::IfNotPresent => write!(f, "ifnotpresent"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// Process-wide cluster defaults.
///
/// Constructed exactly once before any watch starts and passed by ownership to
/// the components that need it; read-only for the remainder of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterDefaults {
    /// Pull policy for bundle images
    pub pull_policy: PullPolicy,
    /// Role granted to bundle sandbox service accounts
    pub sandbox_role: String,
    /// Namespace the operator watches and provisions into
    pub namespace: String,
    /// Whether sandbox namespaces are retained after provisioning
    pub keep_namespace: bool,
}

impl ClusterDefaults {
    /// Defaults for the given watch namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            pull_policy: PullPolicy::Always,
            sandbox_role: "admin".to_string(),
            namespace: namespace.into(),
            keep_namespace: true,
        }
    }
}

/// Trait abstracting watch-namespace resolution
///
/// The hosting runtime supplies the namespace through its environment
/// convention; absence is fatal.
#[cfg_attr(test, automock)]
pub trait NamespaceResolver: Send + Sync {
    /// Resolve the namespace the operator should watch
    fn watch_namespace(&self) -> Result<String>;
}

/// Resolves the watch namespace from the `WATCH_NAMESPACE` environment variable
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvNamespaceResolver;

impl NamespaceResolver for EnvNamespaceResolver {
    fn watch_namespace(&self) -> Result<String> {
        match std::env::var(WATCH_NAMESPACE_ENV) {
            Ok(ns) if !ns.is_empty() => Ok(ns),
            _ => Err(Error::namespace(format!(
                "{WATCH_NAMESPACE_ENV} must be set to the namespace to watch"
            ))),
        }
    }
}

/// Inputs to a bootstrap run, resolved from the CLI
#[derive(Clone, Debug)]
pub struct BootstrapOptions {
    /// Ordered service definitions to resolve and watch
    pub definitions: Vec<ServiceDefinition>,
    /// Resync interval for the established watches
    pub resync: Duration,
}

/// Orchestrates startup over the three external collaborator seams
pub struct Bootstrapper<N, F, R> {
    namespaces: N,
    fetcher: F,
    runtime: R,
}

impl<N, F, R> Bootstrapper<N, F, R>
where
    N: NamespaceResolver,
    F: SpecFetcher,
    R: WatchRuntime,
{
    /// Create a bootstrapper from its collaborators
    pub fn new(namespaces: N, fetcher: F, runtime: R) -> Self {
        Self {
            namespaces,
            fetcher,
            runtime,
        }
    }

    /// Run startup to completion, then block in the event loop.
    ///
    /// Definitions are resolved one at a time, in order; a definition must
    /// fully resolve (or abort the process) before the next is considered.
    /// No watch is established until every definition has resolved, so a
    /// failure anywhere leaves the cluster entirely unwatched rather than
    /// partially covered.
    pub async fn run(&self, options: BootstrapOptions) -> Result<()> {
        let namespace = self.namespaces.watch_namespace()?;
        let resync = options.resync;

        let defaults = Arc::new(ClusterDefaults::new(namespace.clone()));
        info!(
            namespace = %defaults.namespace,
            pull_policy = %defaults.pull_policy,
            sandbox_role = %defaults.sandbox_role,
            keep_namespace = defaults.keep_namespace,
            "cluster defaults initialized"
        );

        if options.definitions.is_empty() {
            warn!("no service definitions configured; the operator will watch nothing");
        }

        let mut registry = TypeRegistry::new();
        let mut builder = DispatchTableBuilder::new();
        let mut registered = Vec::with_capacity(options.definitions.len());

        for definition in &options.definitions {
            let (spec, plan) = resolve_spec(&self.fetcher, definition).await?;
            let registered_type = registry.register(definition)?;
            info!(
                api_version = %definition.api_version,
                kind = %definition.kind,
                spec = %spec.name,
                plan = %plan.name,
                "definition resolved"
            );
            builder.insert(definition, spec, plan)?;
            registered.push(registered_type);
        }

        for registered_type in &registered {
            info!(
                api_version = %registered_type.api_version(),
                kind = %registered_type.gvk.kind,
                namespace = %namespace,
                resync = ?resync,
                "establishing watch"
            );
            self.runtime
                .establish_watch(registered_type, &namespace, resync)
                .await?;
        }

        let table = Arc::new(builder.build());
        info!(entries = table.len(), "dispatch table finalized");

        self.runtime.run(table, defaults).await
    }
}
