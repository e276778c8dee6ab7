//! Tests for the CLI command bodies against an in-memory cluster

use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use viewsync::{check_bucket, load_config, provision, reconcile_views, BucketAction, Config};
use viewsync_storage::mock::{MockConnector, MockEvent};
use viewsync_storage::ReconcileOutcome;

const CONFIG_TOML: &str = r#"
    [cluster]
    nodes = ["cb1.internal"]

    [bucket]
    name = "tickets"
    password = "s3cret"
    connect_timeout_secs = 2

    [design_document]
    name = "tickets"

    [[design_document.views]]
    name = "all_tickets"
    map = "function (d, m) { emit(m.id, d); }"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn tickets_config() -> Config {
    Config::from_toml_str(CONFIG_TOML).expect("Failed to parse config")
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(CONFIG_TOML);

    let config = load_config(Some(file.path())).unwrap();

    assert_eq!(config.bucket.name, "tickets");
    assert!(config.desired_design_document().is_some());
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let file = write_config(
        r#"
        [bucket]
        name = "tickets"
        connect_timeout_secs = 0
        "#,
    );

    let err = load_config(Some(file.path())).unwrap_err();

    assert!(err.to_string().contains("Invalid configuration"));
}

#[tokio::test]
async fn test_check_bucket_opens_reconciles_and_disconnects() {
    let connector = MockConnector::with_bucket("tickets", "s3cret");

    check_bucket(&tickets_config(), Arc::new(connector.clone()))
        .await
        .unwrap();

    assert_eq!(
        connector.events(),
        vec![
            MockEvent::Connect { cluster: 1 },
            MockEvent::OpenBucket {
                cluster: 1,
                bucket: "tickets".to_string()
            },
            MockEvent::GetDesignDocument {
                bucket: "tickets".to_string(),
                document: "tickets".to_string()
            },
            MockEvent::UpsertDesignDocument {
                bucket: "tickets".to_string(),
                document: "tickets".to_string()
            },
            MockEvent::Disconnect { cluster: 1 },
        ]
    );
}

#[tokio::test]
async fn test_check_bucket_reports_wrong_password() {
    let connector = MockConnector::with_bucket("tickets", "another-password");

    let err = check_bucket(&tickets_config(), Arc::new(connector.clone()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Bucket [tickets] is not reachable"));
    assert_eq!(connector.disconnect_count(), 1);
}

#[tokio::test]
async fn test_check_bucket_rejects_invalid_config_before_connecting() {
    let connector = MockConnector::with_bucket("tickets", "s3cret");
    let mut config = tickets_config();
    config.bucket.connect_timeout_secs = 0;

    let err = check_bucket(&config, Arc::new(connector.clone()))
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("Failed to initialize cluster connection"));
    assert_eq!(connector.connect_count(), 0);
}

#[tokio::test]
async fn test_reconcile_views_creates_then_leaves_alone() {
    let connector = MockConnector::with_bucket("tickets", "s3cret");
    let config = tickets_config();

    let first = reconcile_views(&config, Arc::new(connector.clone()))
        .await
        .unwrap();
    let second = reconcile_views(&config, Arc::new(connector.clone()))
        .await
        .unwrap();

    assert_eq!(first, ReconcileOutcome::Created);
    assert_eq!(second, ReconcileOutcome::Unchanged);
    assert_eq!(connector.upsert_count(), 1);
    assert_eq!(
        connector.design_document("tickets", "tickets"),
        config.desired_design_document()
    );
}

#[tokio::test]
async fn test_reconcile_views_without_document_is_skipped() {
    let connector = MockConnector::with_bucket("tickets", "s3cret");
    let mut config = tickets_config();
    config.design_document = None;

    let outcome = reconcile_views(&config, Arc::new(connector.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped);
    assert_eq!(connector.fetch_count(), 0);
}

#[tokio::test]
async fn test_provision_unreachable_management_api() {
    let dead_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut config = Config::default();
    config.provisioning.management_url = format!("http://127.0.0.1:{dead_port}");

    let err = provision(&config, BucketAction::CreateDefault)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("did not answer"));
}
