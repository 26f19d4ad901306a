//! Bundle Operator - watches dynamically-registered bundle kinds and routes
//! them to resolved provisioning plans

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bundle_operator::bootstrap::{BootstrapOptions, Bootstrapper, EnvNamespaceResolver};
use bundle_operator::config::{self, DefinitionFlags};
use bundle_operator::handler::LoggingHandler;
use bundle_operator::runtime::KubeWatchRuntime;
use bundle_operator::spec::EmbeddedSpecFetcher;
use bundle_operator::{Error, DEFAULT_RESYNC_SECS};

/// Bundle Operator - dynamic-kind operator for image-packaged bundles
#[derive(Parser, Debug)]
#[command(name = "bundle-operator", version, about, long_about = None)]
struct Cli {
    /// Time in seconds that the watched resources will be resynced
    #[arg(long, default_value_t = DEFAULT_RESYNC_SECS)]
    resync: u64,

    /// Config file to use; when set it exclusively determines the bundle list
    #[arg(long = "configFile")]
    config_file: Option<PathBuf>,

    /// Kubernetes apiVersion in $GROUP/$VERSION format (e.g. app.example.com/v1alpha1)
    #[arg(long = "api-version")]
    api_version: Option<String>,

    /// Kubernetes CustomResourceDefinition kind (e.g. Postgresql)
    #[arg(long)]
    kind: Option<String>,

    /// Bundle image from which the specification is fetched
    #[arg(long = "apb-image")]
    apb_image: Option<String>,

    /// Plan the operator should resolve for the bundle
    #[arg(long)]
    plan: Option<String>,
}

impl Cli {
    fn definition_flags(&self) -> DefinitionFlags {
        DefinitionFlags {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            image: self.apb_image.clone(),
            plan: self.plan.clone(),
        }
    }
}

/// Log fatally and terminate with the error's exit status
fn fatal(err: Error) -> ! {
    error!(error = %err, "startup failed");
    std::process::exit(err.exit_code());
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "bundle operator starting");

    let cli = Cli::parse();

    let definitions =
        match config::resolve_definitions(cli.config_file.as_deref(), cli.definition_flags()) {
            Ok(definitions) => definitions,
            Err(e) => fatal(e),
        };
    info!(count = definitions.len(), "service definitions resolved");

    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => fatal(Error::Kube(e)),
    };

    let runtime = KubeWatchRuntime::new(client, Arc::new(LoggingHandler));
    // TODO: swap in a registry-backed fetcher once the bundle registry
    // endpoint is plumbed through the config file.
    let fetcher = EmbeddedSpecFetcher;

    let bootstrapper = Bootstrapper::new(EnvNamespaceResolver, fetcher, runtime);
    let options = BootstrapOptions {
        definitions,
        resync: Duration::from_secs(cli.resync),
    };

    // run() blocks in the event loop for the process lifetime; returning is
    // always a failure.
    if let Err(e) = bootstrapper.run(options).await {
        fatal(e);
    }
}
