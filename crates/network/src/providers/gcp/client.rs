//! Compute Engine API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::models::{ListResponse, Operation, Router};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::key::{Key, ResourceKind};
use crate::providers::traits::{
    ComputeResource, ListClient, OperationClient, ResourceClient, RouterClient,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Compute Engine v1 endpoint.
const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

/// Compute Engine API client for one project.
#[derive(Clone)]
pub struct ComputeApi {
    /// HTTP client.
    client: Client,
    /// API base URL.
    base_url: String,
    /// Project ID.
    project_id: String,
    /// Access token (from service account or user).
    access_token: String,
}

impl ComputeApi {
    /// Create a new Compute Engine client.
    ///
    /// # Arguments
    /// * `project_id` - GCP project ID
    /// * `access_token` - `OAuth2` access token
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: COMPUTE_BASE_URL.to_string(),
            project_id: project_id.into(),
            access_token: access_token.into(),
        })
    }

    /// Point the client at a different endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Project this client operates on.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn collection_url(&self, collection: &str, key: &Key) -> String {
        format!(
            "{}/projects/{}/{}/{}",
            self.base_url,
            self.project_id,
            key.scope_path(),
            collection
        )
    }

    fn resource_url(&self, collection: &str, key: &Key) -> String {
        format!("{}/{}", self.collection_url(collection, key), key.name())
    }

    /// Make an authenticated GET request.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated request with a JSON body that returns an operation.
    async fn send_operation<B: serde::Serialize + Sync>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Operation> {
        debug!(url = %url, method = %method, "Request (operation)");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                Error::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound(text))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Error::Auth(text))
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl<R: ComputeResource> ResourceClient<R> for ComputeApi {
    async fn get(&self, key: &Key) -> Result<R> {
        let url = self.resource_url(R::KIND.collection(), key);
        self.get_json(&url, &[]).await
    }

    async fn insert(&self, key: &Key, resource: &R) -> Result<Operation> {
        let url = self.collection_url(R::KIND.collection(), key);
        self.send_operation(reqwest::Method::POST, &url, Some(resource))
            .await
    }

    async fn delete(&self, key: &Key) -> Result<Operation> {
        let url = self.resource_url(R::KIND.collection(), key);
        self.send_operation::<()>(reqwest::Method::DELETE, &url, None)
            .await
    }
}

#[async_trait]
impl<R: ComputeResource> ListClient<R> for ComputeApi {
    async fn list(&self, filter: &Filter) -> Result<Vec<R>> {
        if !R::KIND.is_global() {
            return Err(Error::Config(format!(
                "listing is only supported for global collections, not {}",
                R::KIND
            )));
        }

        let url = self.collection_url(R::KIND.collection(), &Key::global(""));
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = Vec::new();
            if !filter.is_empty() {
                query.push(("filter", filter.to_string()));
            }
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListResponse<R> = self.get_json(&url, &query).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(kind = %R::KIND, count = items.len(), "Listed resources");
        Ok(items)
    }
}

#[async_trait]
impl RouterClient for ComputeApi {
    async fn patch(&self, key: &Key, router: &Router) -> Result<Operation> {
        let url = self.resource_url(ResourceKind::Router.collection(), key);
        self.send_operation(reqwest::Method::PATCH, &url, Some(router))
            .await
    }
}

#[async_trait]
impl OperationClient for ComputeApi {
    async fn get_operation(&self, operation: &Operation) -> Result<Operation> {
        let url = self.resource_url("operations", &operation.key());
        self.get_json(&url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ComputeApi {
        ComputeApi::new("my-project", "token")
            .unwrap()
            .with_base_url("http://localhost:8080/compute/v1/")
    }

    #[test]
    fn test_resource_urls_by_scope() {
        let api = api();
        assert_eq!(
            api.resource_url("networks", &Key::global("net")),
            "http://localhost:8080/compute/v1/projects/my-project/global/networks/net"
        );
        assert_eq!(
            api.resource_url("routers", &Key::regional("net-router", "us-east1")),
            "http://localhost:8080/compute/v1/projects/my-project/regions/us-east1/routers/net-router"
        );
        assert_eq!(
            api.collection_url("instances", &Key::zonal("c-bastion", "us-east1-a")),
            "http://localhost:8080/compute/v1/projects/my-project/zones/us-east1-a/instances"
        );
    }

    #[test]
    fn test_default_base_url() {
        let api = ComputeApi::new("p", "t").unwrap();
        assert_eq!(
            api.resource_url("firewalls", &Key::global("fw")),
            "https://compute.googleapis.com/compute/v1/projects/p/global/firewalls/fw"
        );
        assert_eq!(api.project_id(), "p");
    }
}
