use super::document_store::{not_found, DocumentStore};
use crate::errors::ServiceError;
use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// `DocumentStore` over a json-server style REST backend:
/// `GET/POST /{collection}` and `GET/PATCH/PUT/DELETE /{collection}/{id}`.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ServiceError::InternalError(format!("failed to construct backend http client: {}", e))
        })?;
        Self::with_client(base_url, client)
    }

    /// Build from an existing client (useful for testing).
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ServiceError::ValidationError(format!("invalid backend url '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::ValidationError(format!(
                "backend url '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, %url, "backend request");
        counter!("cssd.backend.requests", 1, "method" => method.as_str().to_string());
        self.client.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        builder.send().await.map_err(|e| {
            counter!("cssd.backend.errors", 1);
            warn!(error = %e, "backend request failed");
            ServiceError::from(e)
        })
    }
}

/// Maps a non-success response onto `ServiceError`, reading the body for
/// the message. 404 becomes `NotFound` for the given record.
async fn check_status(
    response: Response,
    collection: &str,
    id: Option<&str>,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    counter!("cssd.backend.errors", 1);
    if status == StatusCode::NOT_FOUND {
        return Err(not_found(collection, id.unwrap_or("")));
    }

    let body = response.text().await.unwrap_or_default();
    warn!(%status, collection, "backend returned an error status");
    Err(ServiceError::ExternalServiceError(format!(
        "backend returned {} for {}: {}",
        status,
        collection,
        body.trim()
    )))
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, ServiceError> {
        let response = self.send(self.request(Method::GET, &[collection])).await?;
        let response = check_status(response, collection, None).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, ServiceError> {
        let response = self
            .send(self.request(Method::GET, &[collection, id]))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, collection, Some(id)).await?;
        Ok(Some(response.json::<Value>().await?))
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, ServiceError> {
        let response = self
            .send(self.request(Method::POST, &[collection]).json(&document))
            .await?;
        let response = check_status(response, collection, None).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        changes: Value,
    ) -> Result<Value, ServiceError> {
        let response = self
            .send(self.request(Method::PATCH, &[collection, id]).json(&changes))
            .await?;
        let response = check_status(response, collection, Some(id)).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<Value, ServiceError> {
        let response = self
            .send(self.request(Method::PUT, &[collection, id]).json(&document))
            .await?;
        let response = check_status(response, collection, Some(id)).await?;
        Ok(response.json::<Value>().await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ServiceError> {
        let response = self
            .send(self.request(Method::DELETE, &[collection, id]))
            .await?;
        check_status(response, collection, Some(id)).await?;
        Ok(())
    }
}
