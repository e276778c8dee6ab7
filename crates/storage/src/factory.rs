use crate::reconcile::reconcile;
use crate::{BucketDescriptor, BucketHandle, ClusterConnector, ClusterHandle, StorageError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use viewsync_core::{Config, DesignDocument};

/// Connection lifecycle of a [`ClientFactory`]
enum ConnectionState {
    Disconnected,
    Connected(Arc<dyn ClusterHandle>),
    BucketOpen(Arc<dyn ClusterHandle>, Arc<dyn BucketHandle>),
}

impl ConnectionState {
    fn into_cluster(self) -> Option<Arc<dyn ClusterHandle>> {
        match self {
            Self::Disconnected => None,
            Self::Connected(cluster) | Self::BucketOpen(cluster, _) => Some(cluster),
        }
    }
}

/// Produces the bucket client for one cluster.
///
/// The cluster handle is built eagerly at construction, which never blocks on
/// the network, so a process can start while the cluster is unreachable. The
/// bucket is opened on the first [`get_bucket`](Self::get_bucket) call, its
/// design document reconciled, and the handle cached until
/// [`shutdown`](Self::shutdown) or [`initialize_cluster`](Self::initialize_cluster).
///
/// All state transitions are serialized by one async mutex: concurrent first
/// callers wait for the open to finish and then share the same handle.
pub struct ClientFactory {
    endpoints: BTreeSet<String>,
    bucket: BucketDescriptor,
    design_document: Option<DesignDocument>,
    connector: Arc<dyn ClusterConnector>,
    state: Mutex<ConnectionState>,
}

impl ClientFactory {
    /// Create a factory and its cluster handle.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidConfig`] if `endpoints` is empty, the
    /// bucket name is empty, the connect timeout is zero, or the design
    /// document declares the same view twice. Returns
    /// [`StorageError::ClusterInit`] if the connector rejects the endpoints.
    pub fn new<I, S>(
        endpoints: I,
        bucket: BucketDescriptor,
        design_document: Option<DesignDocument>,
        connector: Arc<dyn ClusterConnector>,
    ) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: BTreeSet<String> = endpoints
            .into_iter()
            .map(|e| {
                let endpoint: String = e.into();
                endpoint.trim().to_string()
            })
            .filter(|e| !e.is_empty())
            .collect();

        if endpoints.is_empty() {
            return Err(StorageError::InvalidConfig(
                "At least one cluster node must be provided".to_string(),
            ));
        }
        if bucket.name.trim().is_empty() {
            return Err(StorageError::InvalidConfig(
                "Bucket name must not be empty".to_string(),
            ));
        }
        if bucket.connect_timeout.is_zero() {
            return Err(StorageError::InvalidConfig(format!(
                "Connect timeout for bucket {} must be greater than zero",
                bucket.name
            )));
        }
        if let Some(document) = &design_document {
            let duplicates = document.duplicate_view_names();
            if !duplicates.is_empty() {
                return Err(StorageError::InvalidConfig(format!(
                    "Design document '{}' declares duplicate views: {}",
                    document.name(),
                    duplicates.join(", ")
                )));
            }
        }

        let cluster = Self::connect(connector.as_ref(), &endpoints)?;

        Ok(Self {
            endpoints,
            bucket,
            design_document,
            connector,
            state: Mutex::new(ConnectionState::Connected(cluster)),
        })
    }

    fn connect(
        connector: &dyn ClusterConnector,
        endpoints: &BTreeSet<String>,
    ) -> Result<Arc<dyn ClusterHandle>, StorageError> {
        let nodes: Vec<String> = endpoints.iter().cloned().collect();
        debug!("Creating cluster handle for nodes {:?}", nodes);
        connector.connect(&nodes).map_err(StorageError::ClusterInit)
    }

    /// Replace the cluster handle with a fresh one.
    ///
    /// The existing handle, if any, is shut down first and any cached bucket
    /// is discarded; the next [`get_bucket`](Self::get_bucket) reopens it.
    pub async fn initialize_cluster(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        Self::disconnect(&mut state).await;

        let cluster = Self::connect(self.connector.as_ref(), &self.endpoints)?;
        *state = ConnectionState::Connected(cluster);
        Ok(())
    }

    /// Disconnect from the cluster. Safe to call any number of times.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        Self::disconnect(&mut state).await;
    }

    async fn disconnect(state: &mut ConnectionState) {
        let previous = std::mem::replace(state, ConnectionState::Disconnected);
        if let Some(cluster) = previous.into_cluster() {
            match cluster.disconnect().await {
                Ok(()) => debug!("Disconnected from cluster"),
                Err(e) => warn!("Failed to disconnect from cluster cleanly: {e}"),
            }
        }
    }

    /// Retrieve the bucket, opening it and reconciling views on first use.
    ///
    /// # Errors
    /// - [`StorageError::NotConnected`] after [`shutdown`](Self::shutdown)
    /// - [`StorageError::BucketOpen`] if the bucket cannot be opened
    /// - [`StorageError::Reconciliation`] if the design document cannot be
    ///   checked or written; the bucket stays cached in that case
    pub async fn get_bucket(&self) -> Result<Arc<dyn BucketHandle>, StorageError> {
        let mut state = self.state.lock().await;

        let cluster = match &*state {
            ConnectionState::BucketOpen(_, bucket) => return Ok(Arc::clone(bucket)),
            ConnectionState::Connected(cluster) => Arc::clone(cluster),
            ConnectionState::Disconnected => return Err(StorageError::NotConnected),
        };

        debug!("Trying to connect to bucket [{}]", self.bucket.name);
        let bucket = cluster
            .open_bucket(
                &self.bucket.name,
                &self.bucket.password,
                self.bucket.connect_timeout,
            )
            .await
            .map_err(|source| StorageError::BucketOpen {
                bucket: self.bucket.name.clone(),
                source,
            })?;
        info!("Connected to bucket [{}]", self.bucket.name);

        *state = ConnectionState::BucketOpen(cluster, Arc::clone(&bucket));

        reconcile(bucket.as_ref(), self.design_document.as_ref()).await?;

        Ok(bucket)
    }

    /// True once a bucket handle is cached
    pub async fn is_bucket_open(&self) -> bool {
        matches!(*self.state.lock().await, ConnectionState::BucketOpen(..))
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(String::as_str)
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket.name
    }

    pub fn design_document(&self) -> Option<&DesignDocument> {
        self.design_document.as_ref()
    }
}

/// Creates a client factory for the configured cluster and bucket.
///
/// # Errors
/// Returns an error if the configuration is invalid or the cluster handle
/// cannot be built from the configured nodes.
///
/// # Example
/// ```ignore
/// let config = Config::load(None)?;
/// let connector = Arc::new(RestConnector::from_config(&config.cluster));
/// let factory = create_client_factory(&config, connector)?;
/// let bucket = factory.get_bucket().await?;
/// ```
pub fn create_client_factory(
    config: &Config,
    connector: Arc<dyn ClusterConnector>,
) -> Result<ClientFactory, StorageError> {
    config
        .validate()
        .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

    ClientFactory::new(
        config.cluster.nodes.iter().cloned(),
        BucketDescriptor::from(&config.bucket),
        config.desired_design_document(),
        connector,
    )
}
