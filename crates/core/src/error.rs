use thiserror::Error;

/// Result type for viewsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for viewsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cluster, bucket or view storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
