//! Test utilities for storage integration tests

use std::sync::Arc;
use std::time::Duration;
use viewsync_core::{DesignDocument, View};
use viewsync_storage::mock::MockConnector;
use viewsync_storage::{BucketDescriptor, ClientFactory};

pub const BUCKET: &str = "tickets";
pub const PASSWORD: &str = "s3cret";

pub fn all_tickets() -> View {
    View::new("all_tickets", "function (d, m) { emit(m.id, d); }")
}

pub fn by_expiry() -> View {
    View::with_reduce(
        "by_expiry",
        "function (d, m) { emit(d.expiry, null); }",
        "_count",
    )
}

/// The design document the tests want registered
pub fn desired_document() -> DesignDocument {
    DesignDocument::new("tickets", vec![all_tickets(), by_expiry()])
}

pub fn descriptor() -> BucketDescriptor {
    BucketDescriptor::new(BUCKET, PASSWORD).with_timeout(Duration::from_secs(2))
}

/// A factory over a mock cluster that hosts the `tickets` bucket
#[allow(dead_code)]
pub fn mock_factory(design_document: Option<DesignDocument>) -> (MockConnector, ClientFactory) {
    let connector = MockConnector::with_bucket(BUCKET, PASSWORD);
    let factory = ClientFactory::new(
        ["cb1.internal", "cb2.internal"],
        descriptor(),
        design_document,
        Arc::new(connector.clone()),
    )
    .expect("Failed to create factory");
    (connector, factory)
}
