//! Scenario catalog backend abstraction.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::scenario::Scenario;

/// Which request path a catalog attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogRoute {
    /// Authenticated request.
    Primary,
    /// Credential-less request to the same logical resource.
    Fallback,
}

impl fmt::Display for CatalogRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Failure of a single catalog attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// The backend answered 401 or 403.
    #[error("unauthorized (status {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with another non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body was not a scenario array.
    #[error("malformed catalog response: {0}")]
    Decode(String),
}

impl AttemptError {
    /// Returns true for authorization-class failures (401/403).
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns true for network-level failures.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Backend that serves the scenario catalog over two routes.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Fetches the full catalog through `route`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` describing why this single attempt failed.
    async fn fetch(&self, route: CatalogRoute) -> Result<Vec<Scenario>, AttemptError>;
}
