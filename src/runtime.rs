//! Watch establishment and the event loop
//!
//! [`WatchRuntime`] is the seam between the startup core and the runtime that
//! owns scheduling of reconcile callbacks. The kube-backed implementation
//! watches every registered kind as [`DynamicObject`] instances, merges the
//! streams, and routes each event through the dispatch table to the handler.
//! Once the event loop starts, individual event failures are logged and the
//! process keeps running; only startup is fail-fast.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kube::api::{Api, DynamicObject};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use tokio::sync::Mutex;
use tracing::{error, warn};

#[cfg(test)]
use mockall::automock;

use crate::bootstrap::ClusterDefaults;
use crate::dispatch::DispatchTable;
use crate::handler::ReconcileHandler;
use crate::registry::RegisteredType;
use crate::Result;

/// Kubernetes watch requests cap the server-side timeout
const MAX_WATCH_TIMEOUT_SECS: u64 = 290;

/// Trait abstracting the external watch/event-loop runtime.
///
/// `establish_watch` only accepts a [`RegisteredType`], so a watch can never
/// exist for a kind the runtime cannot decode.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchRuntime: Send + Sync {
    /// Establish a watch for a registered kind in the given namespace
    async fn establish_watch(
        &self,
        registered: &RegisteredType,
        namespace: &str,
        resync: Duration,
    ) -> Result<()>;

    /// Take ownership of the finalized dispatch table and cluster defaults,
    /// then block in the event loop for the process lifetime
    async fn run(&self, table: Arc<DispatchTable>, defaults: Arc<ClusterDefaults>) -> Result<()>;
}

/// One watch the event loop will serve
#[derive(Clone, Debug)]
struct WatchTarget {
    registered: RegisteredType,
    namespace: String,
    resync: Duration,
}

/// Watch runtime backed by the Kubernetes API
pub struct KubeWatchRuntime {
    client: Client,
    handler: Arc<dyn ReconcileHandler>,
    watches: Mutex<Vec<WatchTarget>>,
}

impl KubeWatchRuntime {
    /// Create a runtime dispatching events to the given handler
    pub fn new(client: Client, handler: Arc<dyn ReconcileHandler>) -> Self {
        Self {
            client,
            handler,
            watches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WatchRuntime for KubeWatchRuntime {
    async fn establish_watch(
        &self,
        registered: &RegisteredType,
        namespace: &str,
        resync: Duration,
    ) -> Result<()> {
        self.watches.lock().await.push(WatchTarget {
            registered: registered.clone(),
            namespace: namespace.to_string(),
            resync,
        });
        Ok(())
    }

    async fn run(&self, table: Arc<DispatchTable>, defaults: Arc<ClusterDefaults>) -> Result<()> {
        let targets: Vec<WatchTarget> = self.watches.lock().await.drain(..).collect();
        if targets.is_empty() {
            // Nothing to watch; park until the process is terminated.
            futures::future::pending::<()>().await;
            return Ok(());
        }

        let mut streams = Vec::with_capacity(targets.len());
        for target in &targets {
            let api: Api<DynamicObject> = Api::namespaced_with(
                self.client.clone(),
                &target.namespace,
                &target.registered.resource,
            );
            let config = watcher::Config::default()
                .timeout(target.resync.as_secs().min(MAX_WATCH_TIMEOUT_SECS) as u32);
            streams.push(watcher(api, config).default_backoff().applied_objects().boxed());
        }

        let mut events = stream::select_all(streams);
        while let Some(event) = events.next().await {
            match event {
                Ok(object) => dispatch_event(self.handler.as_ref(), object, &table, &defaults).await,
                Err(e) => warn!(error = %e, "watch stream error"),
            }
        }

        Ok(())
    }
}

/// Route one decoded object through the dispatch table to the handler.
///
/// Lookup misses and handler failures are logged, never fatal: the table was
/// validated complete at startup, and event-level error handling belongs to
/// the external handler.
async fn dispatch_event(
    handler: &dyn ReconcileHandler,
    object: DynamicObject,
    table: &DispatchTable,
    defaults: &ClusterDefaults,
) {
    let Some(types) = object.types.clone() else {
        warn!("dropping event for object without type metadata");
        return;
    };

    match table.lookup(&types.api_version, &types.kind) {
        Some(entry) => {
            if let Err(e) = handler.reconcile(object, entry, defaults).await {
                error!(
                    error = %e,
                    api_version = %types.api_version,
                    kind = %types.kind,
                    "reconcile failed"
                );
            }
        }
        None => warn!(
            api_version = %types.api_version,
            kind = %types.kind,
            "no dispatch entry for event"
        ),
    }
}
