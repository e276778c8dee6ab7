//! In-memory cluster for testing
//!
//! [`MockConnector`] hands out cluster handles that share one in-memory
//! server. Every call is recorded as a [`MockEvent`] so tests can assert on
//! how many opens, fetches and upserts happened, and in which order.

use crate::{BucketHandle, ClientError, ClusterConnector, ClusterHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use viewsync_core::DesignDocument;

/// A call observed by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect { cluster: u64 },
    Disconnect { cluster: u64 },
    OpenBucket { cluster: u64, bucket: String },
    GetDesignDocument { bucket: String, document: String },
    UpsertDesignDocument { bucket: String, document: String },
}

#[derive(Default)]
struct MockServer {
    next_cluster_id: u64,
    // bucket name -> password
    buckets: HashMap<String, String>,
    // bucket name -> design document name -> document
    documents: HashMap<String, HashMap<String, DesignDocument>>,
    events: Vec<MockEvent>,
    reject_connect: Option<String>,
    unavailable: Option<String>,
    fetch_failure: Option<String>,
    upsert_failure: Option<String>,
    disconnect_failure: bool,
}

/// Connector backed by an in-memory server
#[derive(Clone, Default)]
pub struct MockConnector {
    server: Arc<Mutex<MockServer>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose server already hosts `bucket`
    pub fn with_bucket(name: &str, password: &str) -> Self {
        let connector = Self::new();
        connector.add_bucket(name, password);
        connector
    }

    fn server(&self) -> MutexGuard<'_, MockServer> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_bucket(&self, name: &str, password: &str) {
        self.server()
            .buckets
            .insert(name.to_string(), password.to_string());
    }

    /// Store a design document directly, bypassing the event log
    pub fn put_design_document(&self, bucket: &str, document: DesignDocument) {
        self.server()
            .documents
            .entry(bucket.to_string())
            .or_default()
            .insert(document.name().to_string(), document);
    }

    pub fn design_document(&self, bucket: &str, name: &str) -> Option<DesignDocument> {
        self.server()
            .documents
            .get(bucket)
            .and_then(|docs| docs.get(name))
            .cloned()
    }

    /// Make `connect` fail as if the endpoints were malformed
    pub fn reject_connect(&self, reason: Option<&str>) {
        self.server().reject_connect = reason.map(str::to_string);
    }

    /// Make every bucket open fail as if no node answered
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.server().unavailable = reason.map(str::to_string);
    }

    /// Make design document fetches fail with something other than not-found
    pub fn fail_fetches(&self, reason: Option<&str>) {
        self.server().fetch_failure = reason.map(str::to_string);
    }

    pub fn fail_upserts(&self, reason: Option<&str>) {
        self.server().upsert_failure = reason.map(str::to_string);
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.server().disconnect_failure = fail;
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.server().events.clone()
    }

    pub fn clear_events(&self) {
        self.server().events.clear();
    }

    fn count(&self, predicate: impl Fn(&MockEvent) -> bool) -> usize {
        self.server().events.iter().filter(|e| predicate(e)).count()
    }

    pub fn connect_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::Connect { .. }))
    }

    pub fn disconnect_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::Disconnect { .. }))
    }

    pub fn open_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::OpenBucket { .. }))
    }

    pub fn fetch_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::GetDesignDocument { .. }))
    }

    pub fn upsert_count(&self) -> usize {
        self.count(|e| matches!(e, MockEvent::UpsertDesignDocument { .. }))
    }
}

impl ClusterConnector for MockConnector {
    fn connect(&self, endpoints: &[String]) -> Result<Arc<dyn ClusterHandle>, ClientError> {
        let mut server = self.server();
        if let Some(reason) = &server.reject_connect {
            return Err(ClientError::InvalidEndpoint {
                endpoint: endpoints.join(","),
                reason: reason.clone(),
            });
        }

        server.next_cluster_id += 1;
        let id = server.next_cluster_id;
        server.events.push(MockEvent::Connect { cluster: id });

        Ok(Arc::new(MockCluster {
            id,
            connected: Arc::new(AtomicBool::new(true)),
            server: Arc::clone(&self.server),
        }))
    }
}

struct MockCluster {
    id: u64,
    connected: Arc<AtomicBool>,
    server: Arc<Mutex<MockServer>>,
}

#[async_trait]
impl ClusterHandle for MockCluster {
    async fn open_bucket(
        &self,
        name: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn BucketHandle>, ClientError> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.events.push(MockEvent::OpenBucket {
            cluster: self.id,
            bucket: name.to_string(),
        });

        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::Disconnected);
        }
        if server.unavailable.is_some() {
            return Err(ClientError::Timeout(timeout));
        }
        match server.buckets.get(name) {
            None => return Err(ClientError::BucketNotFound(name.to_string())),
            Some(expected) if expected != password => {
                return Err(ClientError::AuthenticationFailed(name.to_string()))
            }
            Some(_) => {}
        }

        Ok(Arc::new(MockBucket {
            name: name.to_string(),
            connected: Arc::clone(&self.connected),
            server: Arc::clone(&self.server),
        }))
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.events.push(MockEvent::Disconnect { cluster: self.id });
        self.connected.store(false, Ordering::Release);

        if server.disconnect_failure {
            return Err(ClientError::Unavailable("disconnect failed".to_string()));
        }
        Ok(())
    }
}

struct MockBucket {
    name: String,
    connected: Arc<AtomicBool>,
    server: Arc<Mutex<MockServer>>,
}

#[async_trait]
impl BucketHandle for MockBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_design_document(&self, name: &str) -> Result<DesignDocument, ClientError> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.events.push(MockEvent::GetDesignDocument {
            bucket: self.name.clone(),
            document: name.to_string(),
        });

        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::Disconnected);
        }
        if let Some(reason) = &server.fetch_failure {
            return Err(ClientError::Unavailable(reason.clone()));
        }

        server
            .documents
            .get(&self.name)
            .and_then(|docs| docs.get(name))
            .cloned()
            .ok_or_else(|| ClientError::DesignDocumentNotFound(name.to_string()))
    }

    async fn upsert_design_document(&self, document: &DesignDocument) -> Result<(), ClientError> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.events.push(MockEvent::UpsertDesignDocument {
            bucket: self.name.clone(),
            document: document.name().to_string(),
        });

        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::Disconnected);
        }
        if let Some(reason) = &server.upsert_failure {
            return Err(ClientError::Unavailable(reason.clone()));
        }

        server
            .documents
            .entry(self.name.clone())
            .or_default()
            .insert(document.name().to_string(), document.clone());
        Ok(())
    }
}
