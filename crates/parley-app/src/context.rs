//! Shared application context.

use std::sync::Arc;

use parley_catalog::{CatalogConfig, CatalogLoader, HttpCatalogTransport};
use parley_core::audio::CueSink;
use parley_core::auth::AuthProvider;
use parley_core::clock::{Clock, SystemClock};
use parley_core::credentials::TokenStore;
use parley_core::transport::CatalogTransport;
use parley_navigation::Navigator;
use parley_reveal::{AudioCueLimiter, CueConfig, RevealConfig};
use parley_session::{HttpAuthProvider, LoginLauncher, Session};

use crate::config::AppConfig;
use crate::error::AppError;

/// The single instance of every process-wide store.
#[derive(Clone)]
pub struct AppContext {
    /// Bearer token shared by the auth provider and the catalog transport.
    pub tokens: Arc<TokenStore>,
    /// Session state.
    pub session: Arc<Session>,
    /// Scenario catalog.
    pub catalog: CatalogLoader,
    /// Screen navigation, loading `catalog` on list entry.
    pub navigator: Navigator,
    /// Rate-limited cue shared by every reveal.
    pub cue: Arc<AudioCueLimiter>,
    /// Timings for the welcome reveal.
    pub reveal_config: RevealConfig,
}

impl AppContext {
    /// Builds the context against the HTTP backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` if an HTTP client cannot be built.
    pub fn new(
        config: &AppConfig,
        launcher: Arc<dyn LoginLauncher>,
        sink: Arc<dyn CueSink>,
    ) -> Result<Self, AppError> {
        let tokens = Arc::new(match &config.auth_token {
            Some(token) => TokenStore::with_token(token.clone()),
            None => TokenStore::new(),
        });
        let provider = HttpAuthProvider::new(&config.auth_http(), tokens.clone(), launcher)
            .map_err(|e| AppError::Http(e.to_string()))?;
        let transport = HttpCatalogTransport::new(config.catalog_http(), tokens.clone())
            .map_err(|e| AppError::Http(e.to_string()))?;

        Ok(Self::from_parts(Parts {
            tokens,
            provider: Arc::new(provider),
            transport: Arc::new(transport),
            sink,
            clock: Arc::new(SystemClock),
            catalog: config.catalog(),
            cue: CueConfig::default(),
            reveal: RevealConfig::default(),
        }))
    }

    /// Builds the context from explicit collaborators.
    #[must_use]
    pub fn from_parts(parts: Parts) -> Self {
        let session = Arc::new(Session::new(parts.provider, parts.clock.clone()));
        let catalog = CatalogLoader::new(parts.transport, parts.clock.clone(), parts.catalog);
        let navigator = Navigator::with_catalog(catalog.clone());
        let cue = Arc::new(AudioCueLimiter::new(parts.sink, parts.clock, parts.cue));
        Self {
            tokens: parts.tokens,
            session,
            catalog,
            navigator,
            cue,
            reveal_config: parts.reveal,
        }
    }
}

/// Collaborators and settings for [`AppContext::from_parts`].
pub struct Parts {
    /// Token store shared with `provider` and `transport`.
    pub tokens: Arc<TokenStore>,
    /// Identity lookups and login hand-off.
    pub provider: Arc<dyn AuthProvider>,
    /// Catalog requests.
    pub transport: Arc<dyn CatalogTransport>,
    /// Audio output for the reveal cue.
    pub sink: Arc<dyn CueSink>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Catalog loader settings.
    pub catalog: CatalogConfig,
    /// Cue limiter settings.
    pub cue: CueConfig,
    /// Reveal timings.
    pub reveal: RevealConfig,
}
