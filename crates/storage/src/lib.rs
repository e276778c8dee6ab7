//! Cluster connection, bucket lifecycle and view reconciliation
//!
//! The [`ClientFactory`] owns one cluster handle and lazily opens one bucket
//! from it. Opening the bucket also brings the bucket's design document in
//! line with the configured views (see [`reconcile`]).

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod error;
mod factory;
pub mod mock;
mod provisioning;
mod reconcile;

// Keep the REST transport private, exposed only through the connector
mod couchbase;

pub use couchbase::RestConnector;
pub use error::{ClientError, StorageError};
pub use factory::{create_client_factory, ClientFactory};
pub use provisioning::{
    create_default_bucket, delete_default_bucket, ManagementClient, ProvisioningResponse,
    DEFAULT_BUCKET_QUOTA_MB, DEFAULT_MANAGEMENT_URL, DEFAULT_PROXY_PORT,
};
pub use reconcile::{reconcile, ReconcileOutcome};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use viewsync_core::{BucketConfig, DesignDocument};

// ==== Traits ====

/// Builds cluster handles from a list of node addresses.
///
/// Connecting must not perform network I/O: a handle is returned even when
/// no node is reachable, and unavailability surfaces when a bucket is opened.
pub trait ClusterConnector: Send + Sync {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn ClusterHandle>, ClientError>;
}

/// A logical connection to a cluster
#[async_trait]
pub trait ClusterHandle: Send + Sync {
    /// Open a bucket, giving up after `timeout`
    async fn open_bucket(
        &self,
        name: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn BucketHandle>, ClientError>;

    /// Release the connection; buckets opened from it stop working
    async fn disconnect(&self) -> Result<(), ClientError>;
}

/// An opened bucket and its view management surface
#[async_trait]
pub trait BucketHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch a registered design document.
    ///
    /// Returns [`ClientError::DesignDocumentNotFound`] when nothing is
    /// registered under `name`.
    async fn get_design_document(&self, name: &str) -> Result<DesignDocument, ClientError>;

    /// Register `document`, replacing whatever was stored under its name
    async fn upsert_design_document(&self, document: &DesignDocument) -> Result<(), ClientError>;
}

// ==== Models ====

/// Name, password and open timeout of the bucket to connect to
#[derive(Clone)]
pub struct BucketDescriptor {
    pub name: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl BucketDescriptor {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for BucketDescriptor {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            password: String::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl std::fmt::Debug for BucketDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketDescriptor")
            .field("name", &self.name)
            .field("password", &"***REDACTED***")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl From<&BucketConfig> for BucketDescriptor {
    fn from(config: &BucketConfig) -> Self {
        Self {
            name: config.name.clone(),
            password: config.password.clone(),
            connect_timeout: config.connect_timeout(),
        }
    }
}
