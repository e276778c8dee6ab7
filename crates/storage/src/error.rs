use std::time::Duration;
use thiserror::Error;
use viewsync_core::Error as CoreError;

/// Errors raised by a cluster transport
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Design document not found: {0}")]
    DesignDocumentNotFound(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Authentication failed for bucket {0}")]
    AuthenticationFailed(String),

    #[error("Operation timeout after {0:?}")]
    Timeout(Duration),

    #[error("Cluster handle is disconnected")]
    Disconnected,

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// True when the server reported that the design document does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DesignDocumentNotFound(_))
    }
}

/// Errors surfaced by the client factory, reconciler and provisioning helpers
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize cluster: {0}")]
    ClusterInit(#[source] ClientError),

    #[error("Cluster is not connected")]
    NotConnected,

    #[error("Failed to connect to bucket {bucket}: {source}")]
    BucketOpen {
        bucket: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to reconcile design document {document}: {source}")]
    Reconciliation {
        document: String,
        #[source]
        source: ClientError,
    },

    #[error("Provisioning request failed: {0}")]
    Provisioning(#[source] reqwest::Error),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidConfig(msg) => CoreError::config(msg),
            other => CoreError::storage(other.to_string()),
        }
    }
}
