//! Reconcile handler interface
//!
//! Reconcile business logic lives outside this crate. The event loop hands
//! each decoded object to a [`ReconcileHandler`] together with the dispatch
//! entry resolved for its kind and the process-wide cluster defaults.

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::info;

#[cfg(test)]
use mockall::automock;

use crate::bootstrap::ClusterDefaults;
use crate::dispatch::DispatchEntry;
use crate::Result;

/// Trait implemented by the external reconcile logic.
///
/// Invocations may run concurrently across kinds and namespaces; the entry and
/// defaults are read-only shared state finalized before the event loop starts.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReconcileHandler: Send + Sync {
    /// Handle one watch event for an object of a registered kind
    async fn reconcile(
        &self,
        object: DynamicObject,
        entry: &DispatchEntry,
        defaults: &ClusterDefaults,
    ) -> Result<()>;
}

/// Handler that records dispatched events without acting on them.
///
/// Used until the embedding binary wires in the bundle provisioning logic.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl ReconcileHandler for LoggingHandler {
    async fn reconcile(
        &self,
        object: DynamicObject,
        entry: &DispatchEntry,
        defaults: &ClusterDefaults,
    ) -> Result<()> {
        info!(
            name = %object.name_any(),
            namespace = %defaults.namespace,
            spec = %entry.spec.name,
            plan = %entry.plan.name,
            "received event for registered kind"
        );
        Ok(())
    }
}
