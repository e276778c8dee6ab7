//! Library interface for the viewsync CLI
//!
//! The command bodies live here so they can be driven against an in-memory
//! cluster in tests; `main.rs` only parses arguments and wires the REST
//! connector in.

pub use anyhow::Result;
pub use viewsync_core::Config;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use viewsync_storage::{
    create_client_factory, reconcile, ClusterConnector, ManagementClient, ProvisioningResponse,
    ReconcileOutcome,
};

/// Load and validate configuration from `path` or the global config file
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the configured bucket once, as a service would on first use
pub async fn check_bucket(config: &Config, connector: Arc<dyn ClusterConnector>) -> Result<()> {
    let factory = create_client_factory(config, connector)
        .context("Failed to initialize cluster connection")?;

    let result = factory
        .get_bucket()
        .await
        .with_context(|| format!("Bucket [{}] is not reachable", config.bucket.name));
    factory.shutdown().await;

    let bucket = result?;
    info!("Bucket [{}] is reachable", bucket.name());
    Ok(())
}

/// Bring the bucket's design document in line with the configured views
pub async fn reconcile_views(
    config: &Config,
    connector: Arc<dyn ClusterConnector>,
) -> Result<ReconcileOutcome> {
    let desired = config.desired_design_document();
    if desired.is_none() {
        warn!("No design document configured, nothing to reconcile");
    }

    // Reconcile explicitly below so the outcome can be reported
    let without_views = Config {
        design_document: None,
        ..config.clone()
    };
    let factory = create_client_factory(&without_views, connector)
        .context("Failed to initialize cluster connection")?;
    let result = async {
        let bucket = factory
            .get_bucket()
            .await
            .with_context(|| format!("Failed to open bucket [{}]", config.bucket.name))?;
        reconcile(bucket.as_ref(), desired.as_ref())
            .await
            .context("Failed to reconcile views")
    }
    .await;
    factory.shutdown().await;

    let outcome = result?;
    info!("Design document reconciliation: {outcome}");
    Ok(outcome)
}

/// Bootstrap action against the management API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAction {
    CreateDefault,
    DeleteDefault,
}

/// Send a provisioning request and return the raw response
pub async fn provision(config: &Config, action: BucketAction) -> Result<ProvisioningResponse> {
    let client = ManagementClient::from_config(&config.provisioning)
        .context("Failed to create management client")?;

    let response = match action {
        BucketAction::CreateDefault => client.create_default_bucket().await,
        BucketAction::DeleteDefault => client.delete_default_bucket().await,
    }
    .with_context(|| format!("Management API at {} did not answer", client.base_url()))?;

    if !response.is_success() {
        warn!(
            "Management API returned {} for {action:?}: {}",
            response.status, response.body
        );
    }
    Ok(response)
}
