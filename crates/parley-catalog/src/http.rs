//! HTTP catalog transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::credentials::TokenStore;
use parley_core::scenario::Scenario;
use parley_core::transport::{AttemptError, CatalogRoute, CatalogTransport};
use reqwest::{Client, StatusCode, header};
use tracing::{debug, instrument};

/// Default catalog path, used for both routes.
pub const DEFAULT_CATALOG_PATH: &str = "/api/scenarios";

/// Default per-request timeout.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the two catalog routes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCatalogConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Path of the authenticated request.
    pub primary_path: String,
    /// Path of the credential-less request.
    pub fallback_path: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpCatalogConfig {
    /// Both routes on the default path of `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            primary_path: DEFAULT_CATALOG_PATH.to_owned(),
            fallback_path: DEFAULT_CATALOG_PATH.to_owned(),
            timeout: DEFAULT_CATALOG_TIMEOUT,
        }
    }
}

/// Fetches the catalog from the backend with `reqwest`.
///
/// The primary route sends `Authorization: Bearer` when a token is held.
/// The fallback route never sends credentials.
pub struct HttpCatalogTransport {
    config: HttpCatalogConfig,
    client: Client,
    tokens: Arc<TokenStore>,
}

impl HttpCatalogTransport {
    /// Builds the transport and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Network` if the HTTP client cannot be built.
    pub fn new(config: HttpCatalogConfig, tokens: Arc<TokenStore>) -> Result<Self, AttemptError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| {
                AttemptError::Network(format!("failed to build catalog HTTP client: {error}"))
            })?;
        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    fn endpoint(&self, route: CatalogRoute) -> String {
        let path = match route {
            CatalogRoute::Primary => &self.config.primary_path,
            CatalogRoute::Fallback => &self.config.fallback_path,
        };
        let base = self.config.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    #[instrument(skip(self))]
    async fn fetch(&self, route: CatalogRoute) -> Result<Vec<Scenario>, AttemptError> {
        let url = self.endpoint(route);
        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if route == CatalogRoute::Primary {
            if let Some(token) = self.tokens.get() {
                request = request.bearer_auth(token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|error| AttemptError::Network(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| AttemptError::Network(format!("response read failed: {error}")))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AttemptError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // A `null` body is served as an empty catalog.
        let items: Option<Vec<Scenario>> =
            serde_json::from_str(&body).map_err(|error| AttemptError::Decode(error.to_string()))?;
        let items = items.unwrap_or_default();
        debug!(%url, count = items.len(), "catalog fetched");
        Ok(items)
    }
}
