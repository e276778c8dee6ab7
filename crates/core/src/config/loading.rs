//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, Config};

/// Free-text settings read verbatim from the environment.
///
/// The `VIEWSYNC_` source infers types, which would turn a password such as
/// `007` into `7`; these keys are re-applied as plain strings on top of it.
const VERBATIM_ENV_KEYS: &[(&str, &str)] = &[
    ("VIEWSYNC_BUCKET__NAME", "bucket.name"),
    ("VIEWSYNC_BUCKET__PASSWORD", "bucket.password"),
    ("VIEWSYNC_DESIGN_DOCUMENT__NAME", "design_document.name"),
    ("VIEWSYNC_PROVISIONING__MANAGEMENT_URL", "provisioning.management_url"),
    ("VIEWSYNC_PROVISIONING__ADMIN_USER", "provisioning.admin_user"),
    ("VIEWSYNC_PROVISIONING__ADMIN_PASSWORD", "provisioning.admin_password"),
];

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

/// Split a comma-separated node list, dropping blanks
pub(crate) fn parse_node_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `VIEWSYNC_` and use double underscores
    /// for nested values. For example:
    /// - `VIEWSYNC_BUCKET__NAME=tickets`
    /// - `VIEWSYNC_CLUSTER__NODES=cb1.local,cb2.local`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        let builder = set_config_default(builder, "cluster.nodes", default_nodes())?;
        let builder = set_config_default(
            builder,
            "cluster.management_port",
            default_management_port() as i64,
        )?;
        let builder =
            set_config_default(builder, "cluster.views_port", default_views_port() as i64)?;
        let builder = set_config_default(
            builder,
            "cluster.request_timeout_secs",
            default_request_timeout_secs() as i64,
        )?;
        let builder = set_config_default(builder, "bucket.name", default_bucket_name())?;
        let builder = set_config_default(builder, "bucket.password", String::new())?;
        let builder = set_config_default(
            builder,
            "bucket.connect_timeout_secs",
            default_connect_timeout_secs() as i64,
        )?;
        let mut builder = set_config_default(
            builder,
            "provisioning.management_url",
            default_management_url(),
        )?;

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with VIEWSYNC_ prefix
        builder = builder.add_source(
            Environment::with_prefix("VIEWSYNC")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cluster.nodes")
                .try_parsing(true),
        );
        for (var, key) in VERBATIM_ENV_KEYS {
            if let Ok(value) = std::env::var(var) {
                builder = builder
                    .set_override(*key, value)
                    .map_err(|e| Error::config(format!("Failed to set {var}: {e}")))?;
            }
        }

        // Support Couchbase-style environment variables
        if let Ok(nodes) = std::env::var("COUCHBASE_NODES") {
            let nodes = parse_node_list(&nodes);
            if nodes.is_empty() {
                tracing::warn!("COUCHBASE_NODES is set but contains no node addresses, ignoring");
            } else {
                builder = builder
                    .set_override("cluster.nodes", nodes)
                    .map_err(|e| Error::config(format!("Failed to set COUCHBASE_NODES: {e}")))?;
            }
        }
        if let Ok(bucket) = std::env::var("COUCHBASE_BUCKET") {
            builder = builder
                .set_override("bucket.name", bucket)
                .map_err(|e| Error::config(format!("Failed to set COUCHBASE_BUCKET: {e}")))?;
        }
        if let Ok(password) = std::env::var("COUCHBASE_PASSWORD") {
            builder = builder
                .set_override("bucket.password", password)
                .map_err(|e| Error::config(format!("Failed to set COUCHBASE_PASSWORD: {e}")))?;
        }

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.viewsync/config.toml or custom --config path)
    /// 3. Environment variables (VIEWSYNC_*, then COUCHBASE_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
