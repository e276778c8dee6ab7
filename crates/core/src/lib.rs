//! Core types for the viewsync bucket connection and view manager
//!
//! This crate provides the foundational pieces shared by the rest of the
//! workspace:
//!
//! - **Design documents**: the view definitions kept in sync with a bucket
//! - **Configuration**: cluster, bucket and provisioning settings
//! - **Error handling**: unified error types
//!

pub mod config;
pub mod design;
pub mod error;

// Re-export main types for convenience
pub use config::{
    BucketConfig, ClusterConfig, Config, DesignDocumentConfig, ProvisioningConfig, ViewConfig,
};
pub use design::{DesignDocument, View};
pub use error::{Error, Result};
