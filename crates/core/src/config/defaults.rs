//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_NODE: &str = "localhost";
pub(crate) const DEFAULT_BUCKET_NAME: &str = "default";
pub(crate) const DEFAULT_MANAGEMENT_URL: &str = "http://localhost:8091";

pub(crate) fn default_nodes() -> Vec<String> {
    vec![DEFAULT_NODE.to_string()]
}

pub(crate) fn default_management_port() -> u16 {
    8091
}

pub(crate) fn default_views_port() -> u16 {
    8092
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_bucket_name() -> String {
    DEFAULT_BUCKET_NAME.to_string()
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    5
}

pub(crate) fn default_management_url() -> String {
    DEFAULT_MANAGEMENT_URL.to_string()
}
