//! Configuration module for viewsync
//!
//! This module provides configuration structures and loading mechanisms.
//! Configuration can be loaded from TOML files and/or environment variables.

mod defaults;
mod loading;


use crate::design::{DesignDocument, View};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.viewsync/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".viewsync").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cluster connection configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Bucket to open on the cluster
    #[serde(default)]
    pub bucket: BucketConfig,

    /// Views to keep registered on the bucket
    #[serde(default)]
    pub design_document: Option<DesignDocumentConfig>,

    /// Management API settings for bucket provisioning
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Configuration for the cluster connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Node addresses (`host`, `host:port` or `http://host:port`)
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Management REST port used when a node address has no port
    #[serde(default = "default_management_port")]
    pub management_port: u16,

    /// Views REST port
    #[serde(default = "default_views_port")]
    pub views_port: u16,

    /// Per-request timeout for REST calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            management_port: default_management_port(),
            views_port: default_views_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration for the bucket
#[derive(Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name
    #[serde(default = "default_bucket_name")]
    pub name: String,

    /// Bucket password, empty when the bucket has none
    #[serde(default)]
    pub password: String,

    /// Timeout for opening the bucket, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl BucketConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: default_bucket_name(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for BucketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketConfig")
            .field("name", &self.name)
            .field("password", &"***REDACTED***")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// A single view as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    pub map: String,
    #[serde(default)]
    pub reduce: Option<String>,
}

impl From<&ViewConfig> for View {
    fn from(view: &ViewConfig) -> Self {
        View {
            name: view.name.clone(),
            map: view.map.clone(),
            reduce: view.reduce.clone(),
        }
    }
}

/// Design document and views to create in the bucket, if any
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignDocumentConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl DesignDocumentConfig {
    /// Build the desired document
    ///
    /// Returns `None` when either the name or the views are missing, which
    /// disables reconciliation.
    pub fn to_design_document(&self) -> Option<DesignDocument> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        if self.views.is_empty() {
            return None;
        }
        Some(DesignDocument::new(
            name,
            self.views.iter().map(View::from).collect(),
        ))
    }
}

/// Configuration for the bucket provisioning helpers
#[derive(Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Base URL of the cluster management API
    #[serde(default = "default_management_url")]
    pub management_url: String,

    /// Administrator user for the management API
    #[serde(default)]
    pub admin_user: Option<String>,

    /// Administrator password for the management API
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            management_url: default_management_url(),
            admin_user: None,
            admin_password: None,
        }
    }
}

impl std::fmt::Debug for ProvisioningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningConfig")
            .field("management_url", &self.management_url)
            .field("admin_user", &self.admin_user)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

impl Config {
    /// The desired design document, if reconciliation is enabled
    pub fn desired_design_document(&self) -> Option<DesignDocument> {
        self.design_document
            .as_ref()
            .and_then(DesignDocumentConfig::to_design_document)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cluster.nodes.iter().all(|n| n.trim().is_empty()) {
            return Err(Error::config(
                "At least one cluster node must be configured".to_string(),
            ));
        }

        if self.cluster.management_port == 0 || self.cluster.views_port == 0 {
            return Err(Error::config(format!(
                "Invalid cluster ports: management {}, views {}",
                self.cluster.management_port, self.cluster.views_port
            )));
        }

        if self.cluster.request_timeout_secs == 0 {
            return Err(Error::config(
                "cluster.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.bucket.name.trim().is_empty() {
            return Err(Error::config("Bucket name must not be empty".to_string()));
        }

        if self.bucket.connect_timeout_secs == 0 {
            return Err(Error::config(
                "bucket.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if let Some(document) = self.desired_design_document() {
            let duplicates = document.duplicate_view_names();
            if !duplicates.is_empty() {
                return Err(Error::config(format!(
                    "Design document '{}' declares duplicate views: {}",
                    document.name(),
                    duplicates.join(", ")
                )));
            }
        }

        if self.provisioning.admin_password.is_some() && self.provisioning.admin_user.is_none() {
            return Err(Error::config(
                "provisioning.admin_password is set without provisioning.admin_user".to_string(),
            ));
        }

        Ok(())
    }
}
