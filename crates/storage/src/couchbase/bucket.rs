//! REST bucket handle: design document fetch and upsert on the views API

use super::client::Node;
use crate::{BucketHandle, ClientError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use viewsync_core::{DesignDocument, View};

/// Design document body as stored by the views API
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct DesignDocumentBody {
    #[serde(default)]
    views: BTreeMap<String, ViewBody>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ViewBody {
    map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reduce: Option<String>,
}

impl From<&DesignDocument> for DesignDocumentBody {
    fn from(document: &DesignDocument) -> Self {
        let views = document
            .views()
            .iter()
            .map(|v| {
                (
                    v.name.clone(),
                    ViewBody {
                        map: v.map.clone(),
                        reduce: v.reduce.clone(),
                    },
                )
            })
            .collect();
        Self { views }
    }
}

impl DesignDocumentBody {
    fn into_document(self, name: &str) -> DesignDocument {
        let views = self
            .views
            .into_iter()
            .map(|(view_name, body)| View {
                name: view_name,
                map: body.map,
                reduce: body.reduce,
            })
            .collect();
        DesignDocument::new(name, views)
    }
}

/// Bucket handle over the views REST API
pub(crate) struct RestBucket {
    http: Client,
    name: String,
    password: String,
    nodes: Arc<Vec<Node>>,
}

impl RestBucket {
    pub(crate) fn new(
        http: Client,
        name: impl Into<String>,
        password: impl Into<String>,
        nodes: Arc<Vec<Node>>,
    ) -> Self {
        Self {
            http,
            name: name.into(),
            password: password.into(),
            nodes,
        }
    }

    /// Send a request for `document` to the first node that answers
    async fn send<F>(&self, document: &str, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client, Url) -> RequestBuilder,
    {
        let mut last_error = None;

        for node in self.nodes.iter() {
            let url = node.views_url(&[self.name.as_str(), "_design", document]);
            debug!("Sending design document request to {url}");

            match build(&self.http, url.clone())
                .basic_auth(&self.name, Some(&self.password))
                .send()
                .await
            {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Views endpoint {url} did not answer: {e}");
                    last_error = Some(ClientError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::Unavailable("no cluster nodes".to_string())))
    }

    async fn unexpected(&self, response: Response) -> ClientError {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::AuthenticationFailed(self.name.clone())
            }
            status => ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            },
        }
    }
}

#[async_trait]
impl BucketHandle for RestBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_design_document(&self, name: &str) -> Result<DesignDocument, ClientError> {
        let response = self.send(name, |http, url| http.get(url)).await?;

        match response.status() {
            status if status.is_success() => {
                let body: DesignDocumentBody = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(body.into_document(name))
            }
            StatusCode::NOT_FOUND => Err(ClientError::DesignDocumentNotFound(name.to_string())),
            _ => Err(self.unexpected(response).await),
        }
    }

    async fn upsert_design_document(&self, document: &DesignDocument) -> Result<(), ClientError> {
        let body = DesignDocumentBody::from(document);
        let response = self
            .send(document.name(), |http, url| http.put(url).json(&body))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.unexpected(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_serializes_views_by_name() {
        let document = DesignDocument::new(
            "tickets",
            vec![
                View::new("all", "function (d) { emit(null, null); }"),
                View::with_reduce("by_expiry", "function (d) { emit(d.expiry); }", "_count"),
            ],
        );

        let value = serde_json::to_value(DesignDocumentBody::from(&document)).unwrap();
        assert_eq!(
            value,
            json!({
                "views": {
                    "all": { "map": "function (d) { emit(null, null); }" },
                    "by_expiry": {
                        "map": "function (d) { emit(d.expiry); }",
                        "reduce": "_count"
                    }
                }
            })
        );
    }

    #[test]
    fn test_body_round_trips_to_equal_document() {
        let document = DesignDocument::new(
            "tickets",
            vec![
                View::with_reduce("b", "function (d) { emit(d.b); }", "_sum"),
                View::new("a", "function (d) { emit(d.a); }"),
            ],
        );
        let raw = serde_json::to_string(&DesignDocumentBody::from(&document)).unwrap();
        let parsed: DesignDocumentBody = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.into_document("tickets"), document);
    }

    #[test]
    fn test_body_ignores_unknown_fields() {
        let parsed: DesignDocumentBody = serde_json::from_value(json!({
            "_id": "_design/tickets",
            "language": "javascript",
            "views": { "all": { "map": "function (d) {}" } }
        }))
        .unwrap();
        let document = parsed.into_document("tickets");
        assert_eq!(document.views().len(), 1);
        assert!(document.view("all").is_some());
    }
}
