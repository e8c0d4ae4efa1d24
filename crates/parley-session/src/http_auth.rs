//! HTTP auth collaborator backed by the scenario backend's `/api/auth` routes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::auth::{AuthError, AuthProvider};
use parley_core::credentials::TokenStore;
use parley_core::identity::Identity;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Login providers the backend knows how to redirect to.
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["google", "facebook"];

/// Default per-request timeout for auth calls.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Opens the external login page. The terminal front-end prints the URL;
/// a desktop shell would open a browser.
pub trait LoginLauncher: Send + Sync {
    /// Sends the user to `url`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` if the URL could not be handed off.
    fn launch(&self, url: &str) -> Result<(), AuthError>;
}

/// Settings for [`HttpAuthProvider`].
#[derive(Debug, Clone)]
pub struct HttpAuthConfig {
    /// Backend base URL, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpAuthConfig {
    /// Creates a config for `base_url` with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    authenticated: bool,
    user: Option<MeUser>,
}

#[derive(Debug, Deserialize)]
struct MeUser {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

impl From<MeUser> for Identity {
    fn from(user: MeUser) -> Self {
        let display_name = user
            .name
            .clone()
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.sub.clone());
        Self {
            id: user.sub,
            display_name,
            avatar_url: user.picture,
            email: user.email,
            provider: user.provider,
        }
    }
}

/// Auth provider that resolves identities with `GET /api/auth/me` and starts
/// logins by redirecting to `/api/auth/login/{provider}`.
pub struct HttpAuthProvider {
    base_url: String,
    client: Client,
    tokens: Arc<TokenStore>,
    launcher: Arc<dyn LoginLauncher>,
}

impl HttpAuthProvider {
    /// Builds the provider and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` if the HTTP client cannot be built.
    pub fn new(
        config: &HttpAuthConfig,
        tokens: Arc<TokenStore>,
        launcher: Arc<dyn LoginLauncher>,
    ) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| {
                AuthError::Transport(format!("failed to build auth HTTP client: {error}"))
            })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client,
            tokens,
            launcher,
        })
    }

    /// Returns the URL that starts the external login flow for `provider`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for unknown providers.
    pub fn login_url(&self, provider: &str) -> Result<String, AuthError> {
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_owned()));
        }
        Ok(format!("{}/api/auth/login/{provider}", self.base_url))
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    #[instrument(skip(self))]
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        let Some(token) = self.tokens.get() else {
            debug!("no token held, skipping identity lookup");
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/api/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| AuthError::Transport(format!("identity lookup failed: {error}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            info!("held token rejected, dropping it");
            self.tokens.clear();
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Transport(format!(
                "identity lookup failed with status {status}"
            )));
        }

        let body: MeResponse = response
            .json()
            .await
            .map_err(|error| AuthError::Decode(error.to_string()))?;
        if !body.authenticated {
            return Ok(None);
        }
        Ok(body.user.map(Identity::from))
    }

    #[instrument(skip(self))]
    async fn begin_login(&self, provider: &str) -> Result<(), AuthError> {
        let url = self.login_url(provider)?;
        self.launcher.launch(&url)
    }

    fn logout(&self) {
        self.tokens.clear();
    }
}

/// Extracts the `token` query parameter from the URL the backend redirects
/// to after a successful login.
///
/// # Errors
///
/// Returns `AuthError::Decode` if `callback_url` is not a valid URL.
pub fn capture_callback_token(callback_url: &str) -> Result<Option<String>, AuthError> {
    let url = Url::parse(callback_url)
        .map_err(|error| AuthError::Decode(format!("invalid callback URL: {error}")))?;
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}
