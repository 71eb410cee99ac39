//! Resource Directory
//!
//! Discovery of the service endpoints available to an authenticated session.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{create_error_from_response, SessionError, SessionResult};
use crate::types::{ResourceMap, TokenBundle, DEFAULT_TIMEOUT_SECS};

/// Resource directory interface.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Given a valid token bundle, return the resource map.
    async fn fetch_resources(&self, bundle: &TokenBundle) -> SessionResult<ResourceMap>;
}

/// Reads the versioned REST root of the bundle's instance.
pub struct HttpResourceDirectory<T: HttpTransport> {
    transport: Arc<T>,
    api_version: String,
    timeout: Duration,
}

impl<T: HttpTransport> HttpResourceDirectory<T> {
    /// Create new resource directory for `api_version` (e.g. "50.0").
    pub fn new(transport: Arc<T>, api_version: impl Into<String>) -> Self {
        Self {
            transport,
            api_version: api_version.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL listing the resources of `bundle`'s instance.
    pub fn resources_url(&self, bundle: &TokenBundle) -> String {
        format!(
            "{}/services/data/v{}/",
            bundle.instance_url.trim_end_matches('/'),
            self.api_version.trim_start_matches('v')
        )
    }
}

#[async_trait]
impl<T: HttpTransport> ResourceDirectory for HttpResourceDirectory<T> {
    async fn fetch_resources(&self, bundle: &TokenBundle) -> SessionResult<ResourceMap> {
        let url = self.resources_url(bundle);
        debug!(url = %url, "Fetching resource map");

        let request = HttpRequest::bearer_get(url, &bundle.access_token).with_timeout(self.timeout);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        // Non-string entries are not endpoint URLs.
        let body: serde_json::Map<String, serde_json::Value> = response.json()?;
        Ok(body
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(url) => Some((name, url)),
                _ => None,
            })
            .collect())
    }
}

/// Mock resource directory for testing.
#[derive(Default)]
pub struct MockResourceDirectory {
    resources: Mutex<ResourceMap>,
    fetch_history: Mutex<Vec<TokenBundle>>,
    next_error: Mutex<Option<SessionError>>,
}

impl MockResourceDirectory {
    /// Create new mock directory returning an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create mock directory returning `resources`.
    pub fn with_resources(resources: ResourceMap) -> Self {
        Self {
            resources: Mutex::new(resources),
            ..Default::default()
        }
    }

    /// Set next error.
    pub fn set_next_error(&self, error: SessionError) -> &Self {
        *self.next_error.lock().unwrap() = Some(error);
        self
    }

    /// Bundles the directory was asked about.
    pub fn get_fetch_history(&self) -> Vec<TokenBundle> {
        self.fetch_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceDirectory for MockResourceDirectory {
    async fn fetch_resources(&self, bundle: &TokenBundle) -> SessionResult<ResourceMap> {
        self.fetch_history.lock().unwrap().push(bundle.clone());

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.resources.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HttpMethod, MockHttpTransport};
    use crate::types::DEFAULT_API_VERSION;

    fn test_bundle() -> TokenBundle {
        TokenBundle {
            access_token: "AT1".to_string(),
            instance_url: "https://inst/".to_string(),
            id: "ID1".to_string(),
            issued_at: "100".to_string(),
            signature: "SIG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_resources() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &serde_json::json!({
                "sobjects": "/services/data/v50.0/sobjects",
                "query": "/services/data/v50.0/query",
                "limits": {"nested": true}
            }),
        );
        let directory = HttpResourceDirectory::new(transport.clone(), "v50.0");

        let resources = directory.fetch_resources(&test_bundle()).await.unwrap();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources["query"], "/services/data/v50.0/query");

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "https://inst/services/data/v50.0/");
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer AT1")
        );
    }

    #[tokio::test]
    async fn test_fetch_resources_unauthorized() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            401,
            &serde_json::json!([{"errorCode": "INVALID_SESSION_ID", "message": "expired"}]),
        );
        let directory = HttpResourceDirectory::new(transport, DEFAULT_API_VERSION);

        let result = directory.fetch_resources(&test_bundle()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_directory() {
        let mut resources = ResourceMap::new();
        resources.insert("tooling".to_string(), "/tooling".to_string());
        let directory = MockResourceDirectory::with_resources(resources.clone());

        assert_eq!(directory.fetch_resources(&test_bundle()).await.unwrap(), resources);
        assert_eq!(directory.get_fetch_history().len(), 1);
    }
}
