//! Bucket provisioning tests against an in-process management API

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{delete, post},
    Form, Router,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use viewsync_core::ProvisioningConfig;
use viewsync_storage::{ManagementClient, StorageError};

// base64("Administrator:password")
const ADMIN_AUTH: &str = "Basic QWRtaW5pc3RyYXRvcjpwYXNzd29yZA==";

#[derive(Debug, Clone, PartialEq)]
struct Received {
    method: &'static str,
    authorization: Option<String>,
    form: HashMap<String, String>,
}

type Shared = Arc<Mutex<Vec<Received>>>;

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn delete_bucket(State(state): State<Shared>, headers: HeaderMap) -> (StatusCode, String) {
    state.lock().unwrap().push(Received {
        method: "DELETE",
        authorization: authorization(&headers),
        form: HashMap::new(),
    });
    (StatusCode::OK, String::new())
}

async fn create_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    let mut received = state.lock().unwrap();
    let exists = received.iter().any(|r| r.method == "POST");
    received.push(Received {
        method: "POST",
        authorization: authorization(&headers),
        form,
    });

    if exists {
        (
            StatusCode::BAD_REQUEST,
            r#"{"errors":{"name":"Bucket with given name already exists"}}"#.to_string(),
        )
    } else {
        (StatusCode::ACCEPTED, String::new())
    }
}

async fn start_management_api(state: Shared) -> String {
    let app = Router::new()
        .route("/pools/default/buckets/default", delete(delete_bucket))
        .route("/pools/default/buckets", post(create_bucket))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn test_create_default_bucket_sends_fixed_form() {
    let state = Shared::default();
    let url = start_management_api(state.clone()).await;

    let response = ManagementClient::new(url)
        .unwrap()
        .create_default_bucket()
        .await
        .unwrap();

    assert_eq!(response.status, 202);
    assert!(response.is_success());

    let received = state.lock().unwrap();
    assert_eq!(received.len(), 1);
    let expected: HashMap<String, String> = [
        ("authType", "none"),
        ("name", "default"),
        ("bucketType", "couchbase"),
        ("proxyPort", "11216"),
        ("ramQuotaMB", "120"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(received[0].form, expected);
    assert_eq!(received[0].authorization, None);
}

#[tokio::test]
async fn test_second_create_returns_raw_failure() {
    let state = Shared::default();
    let url = start_management_api(state).await;
    let client = ManagementClient::new(url).unwrap();

    client.create_default_bucket().await.unwrap();
    let response = client.create_default_bucket().await.unwrap();

    assert_eq!(response.status, 400);
    assert!(!response.is_success());
    assert!(response.body.contains("already exists"));
}

#[tokio::test]
async fn test_delete_default_bucket_with_admin_credentials() {
    let state = Shared::default();
    let url = start_management_api(state.clone()).await;
    let config = ProvisioningConfig {
        management_url: url,
        admin_user: Some("Administrator".to_string()),
        admin_password: Some("password".to_string()),
    };

    let response = ManagementClient::from_config(&config)
        .unwrap()
        .delete_default_bucket()
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let received = state.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "DELETE");
    assert_eq!(received[0].authorization.as_deref(), Some(ADMIN_AUTH));
}

#[tokio::test]
async fn test_unknown_route_is_returned_not_raised() {
    let state = Shared::default();
    let url = start_management_api(state).await;
    let client = ManagementClient::new(format!("{url}nested")).unwrap();

    let response = client.delete_default_bucket().await.unwrap();

    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_unreachable_management_api_is_transport_error() {
    let dead_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ManagementClient::new(format!("http://127.0.0.1:{dead_port}")).unwrap();

    let result = client.create_default_bucket().await;

    assert!(matches!(result, Err(StorageError::Provisioning(_))));
}
