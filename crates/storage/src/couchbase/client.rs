//! REST cluster handle: node addressing and bucket opening

use super::bucket::RestBucket;
use crate::{BucketHandle, ClientError, ClusterConnector, ClusterHandle};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use viewsync_core::ClusterConfig;

const DEFAULT_MANAGEMENT_PORT: u16 = 8091;
const DEFAULT_VIEWS_PORT: u16 = 8092;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Subset of the bucket details returned by the management API
#[derive(Debug, Deserialize)]
struct BucketInfo {
    name: String,
}

/// Management and views base URLs of one cluster node
#[derive(Debug, Clone)]
pub(crate) struct Node {
    management: Url,
    views: Url,
}

impl Node {
    /// Parse `host`, `host:port` or `scheme://host[:port]`.
    ///
    /// A missing scheme means `http`; a missing port means `management_port`.
    /// IPv6 hosts are accepted bare (`::1`) or bracketed (`[::1]:8091`).
    pub(crate) fn parse(
        endpoint: &str,
        management_port: u16,
        views_port: u16,
    ) -> Result<Self, ClientError> {
        let invalid = |reason: &str| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = endpoint.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("empty address"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else if trimmed.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{trimmed}]")
        } else {
            format!("http://{trimmed}")
        };

        let mut management = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(management.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if management.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if management.path() != "/" {
            return Err(invalid("node address must not contain a path"));
        }
        if management.port().is_none() {
            management
                .set_port(Some(management_port))
                .map_err(|_| invalid("cannot set management port"))?;
        }

        let mut views = management.clone();
        views
            .set_port(Some(views_port))
            .map_err(|_| invalid("cannot set views port"))?;

        Ok(Self { management, views })
    }

    pub(crate) fn management_url(&self, segments: &[&str]) -> Url {
        join(&self.management, segments)
    }

    pub(crate) fn views_url(&self, segments: &[&str]) -> Url {
        join(&self.views, segments)
    }
}

fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Builds [`ClusterHandle`]s that talk to the cluster's REST APIs
#[derive(Debug, Clone)]
pub struct RestConnector {
    management_port: u16,
    views_port: u16,
    request_timeout: Duration,
}

impl RestConnector {
    pub fn new(management_port: u16, views_port: u16, request_timeout: Duration) -> Self {
        Self {
            management_port,
            views_port,
            request_timeout,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(
            config.management_port,
            config.views_port,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

impl Default for RestConnector {
    fn default() -> Self {
        Self::new(
            DEFAULT_MANAGEMENT_PORT,
            DEFAULT_VIEWS_PORT,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

impl ClusterConnector for RestConnector {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn ClusterHandle>, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::InvalidEndpoint {
                endpoint: String::new(),
                reason: "no cluster nodes given".to_string(),
            });
        }

        let nodes = endpoints
            .iter()
            .map(|e| Node::parse(e, self.management_port, self.views_port))
            .collect::<Result<Vec<_>, _>>()?;

        let http = Client::builder().timeout(self.request_timeout).build()?;

        Ok(Arc::new(RestCluster {
            http,
            nodes: Arc::new(nodes),
            connected: AtomicBool::new(true),
        }))
    }
}

/// Cluster handle over the management REST API
pub(crate) struct RestCluster {
    http: Client,
    nodes: Arc<Vec<Node>>,
    connected: AtomicBool,
}

impl RestCluster {
    /// Ask nodes in order for the bucket; the first node that answers decides.
    async fn probe_bucket(&self, name: &str, password: &str) -> Result<(), ClientError> {
        let mut last_error = None;

        for node in self.nodes.iter() {
            let url = node.management_url(&["pools", "default", "buckets", name]);
            debug!("Requesting bucket details from {url}");

            match self
                .http
                .get(url.clone())
                .basic_auth(name, Some(password))
                .send()
                .await
            {
                Ok(response) => return check_bucket_response(name, response).await,
                Err(e) => {
                    warn!("Cluster node {url} did not answer: {e}");
                    last_error = Some(ClientError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::Unavailable("no cluster nodes".to_string())))
    }
}

async fn check_bucket_response(name: &str, response: Response) -> Result<(), ClientError> {
    match response.status() {
        status if status.is_success() => {
            let info: BucketInfo = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            if info.name != name {
                return Err(ClientError::Decode(format!(
                    "requested bucket {name} but the cluster described {}",
                    info.name
                )));
            }
            Ok(())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ClientError::AuthenticationFailed(name.to_string()))
        }
        StatusCode::NOT_FOUND => Err(ClientError::BucketNotFound(name.to_string())),
        status => Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        }),
    }
}

#[async_trait]
impl ClusterHandle for RestCluster {
    async fn open_bucket(
        &self,
        name: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn BucketHandle>, ClientError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::Disconnected);
        }

        tokio::time::timeout(timeout, self.probe_bucket(name, password))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;

        Ok(Arc::new(RestBucket::new(
            self.http.clone(),
            name,
            password,
            Arc::clone(&self.nodes),
        )))
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}
