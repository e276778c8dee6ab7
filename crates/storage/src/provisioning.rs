//! Bootstrap helpers that create or remove the `default` bucket
//!
//! Intended for test and development clusters. Requests are sent once and the
//! raw response is handed back; status codes are not interpreted.

use crate::StorageError;
use reqwest::{Client, RequestBuilder};
use tracing::info;
use viewsync_core::ProvisioningConfig;

pub const DEFAULT_MANAGEMENT_URL: &str = "http://localhost:8091";

/// Memory quota of the provisioned bucket, in megabytes
pub const DEFAULT_BUCKET_QUOTA_MB: u32 = 120;

pub const DEFAULT_PROXY_PORT: u16 = 11216;

const DEFAULT_BUCKET_NAME: &str = "default";

/// Status and body of a management API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResponse {
    pub status: u16,
    pub body: String,
}

impl ProvisioningResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the cluster management API
#[derive(Clone)]
pub struct ManagementClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl ManagementClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StorageError> {
        let http = Client::builder()
            .build()
            .map_err(StorageError::Provisioning)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Authenticate management calls with HTTP basic auth
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((user.into(), password));
        self
    }

    pub fn from_config(config: &ProvisioningConfig) -> Result<Self, StorageError> {
        let client = Self::new(config.management_url.clone())?;
        Ok(match &config.admin_user {
            Some(user) => client.with_credentials(user.clone(), config.admin_password.clone()),
            None => client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delete the bucket named `default`
    pub async fn delete_default_bucket(&self) -> Result<ProvisioningResponse, StorageError> {
        let url = format!(
            "{}/pools/default/buckets/{DEFAULT_BUCKET_NAME}",
            self.base_url
        );
        info!("Deleting bucket [{DEFAULT_BUCKET_NAME}] via {url}");
        self.execute(self.http.delete(url)).await
    }

    /// Create a persistent bucket named `default` with no authentication
    pub async fn create_default_bucket(&self) -> Result<ProvisioningResponse, StorageError> {
        let url = format!("{}/pools/default/buckets", self.base_url);
        let quota = DEFAULT_BUCKET_QUOTA_MB.to_string();
        let proxy_port = DEFAULT_PROXY_PORT.to_string();
        let form = [
            ("authType", "none"),
            ("name", DEFAULT_BUCKET_NAME),
            ("bucketType", "couchbase"),
            ("proxyPort", proxy_port.as_str()),
            ("ramQuotaMB", quota.as_str()),
        ];

        info!("Creating bucket [{DEFAULT_BUCKET_NAME}] via {url}");
        self.execute(self.http.post(url).form(&form)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<ProvisioningResponse, StorageError> {
        let request = match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_ref()),
            None => request,
        };

        let response = request.send().await.map_err(StorageError::Provisioning)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(StorageError::Provisioning)?;

        info!("Management API answered {status}");
        Ok(ProvisioningResponse { status, body })
    }
}

/// Delete the `default` bucket on the local cluster
pub async fn delete_default_bucket() -> Result<ProvisioningResponse, StorageError> {
    ManagementClient::new(DEFAULT_MANAGEMENT_URL)?
        .delete_default_bucket()
        .await
}

/// Create the `default` bucket on the local cluster
pub async fn create_default_bucket() -> Result<ProvisioningResponse, StorageError> {
    ManagementClient::new(DEFAULT_MANAGEMENT_URL)?
        .create_default_bucket()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ManagementClient::new("http://cb1:8091/").unwrap();
        assert_eq!(client.base_url(), "http://cb1:8091");
    }

    #[test]
    fn test_response_success_range() {
        let ok = ProvisioningResponse {
            status: 202,
            body: String::new(),
        };
        let conflict = ProvisioningResponse {
            status: 400,
            body: "{\"errors\":{\"name\":\"Bucket with given name already exists\"}}".to_string(),
        };
        assert!(ok.is_success());
        assert!(!conflict.is_success());
    }
}
