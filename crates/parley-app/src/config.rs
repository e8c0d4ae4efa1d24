//! Environment configuration.

use std::time::Duration;

use parley_catalog::{CatalogConfig, FallbackPolicy, HttpCatalogConfig};
use parley_catalog::http::DEFAULT_CATALOG_PATH;
use parley_session::HttpAuthConfig;

use crate::error::AppError;

/// Backend used when `PARLEY_BACKEND_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the scenario and auth backend.
    pub backend_url: String,
    /// Path of the authenticated catalog request.
    pub catalog_path: String,
    /// Path of the credential-less catalog request.
    pub fallback_path: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Which primary failures fall back to the public request.
    pub fallback_policy: FallbackPolicy,
    /// Token captured from an earlier login callback.
    pub auth_token: Option<String>,
    /// Skip the intro reveal at startup.
    pub skip_intro: bool,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let request_timeout = match get("PARLEY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    AppError::Config(format!("PARLEY_REQUEST_TIMEOUT_SECS must be a whole number: {e}"))
                })?;
                if secs == 0 {
                    return Err(AppError::Config(
                        "PARLEY_REQUEST_TIMEOUT_SECS must be greater than zero".to_owned(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let fallback_policy = match get("PARLEY_FALLBACK_POLICY") {
            Some(raw) => raw
                .parse::<FallbackPolicy>()
                .map_err(|e| AppError::Config(e.to_string()))?,
            None => FallbackPolicy::default(),
        };

        let skip_intro = match get("PARLEY_SKIP_INTRO").as_deref() {
            None | Some("0" | "false" | "no") => false,
            Some("1" | "true" | "yes") => true,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "PARLEY_SKIP_INTRO must be true or false, got `{other}`"
                )));
            }
        };

        Ok(Self {
            backend_url: get("PARLEY_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_owned()),
            catalog_path: get("PARLEY_CATALOG_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_owned()),
            fallback_path: get("PARLEY_FALLBACK_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_owned()),
            request_timeout,
            fallback_policy,
            auth_token: get("PARLEY_AUTH_TOKEN"),
            skip_intro,
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Settings for the HTTP catalog transport.
    #[must_use]
    pub fn catalog_http(&self) -> HttpCatalogConfig {
        HttpCatalogConfig {
            base_url: self.backend_url.clone(),
            primary_path: self.catalog_path.clone(),
            fallback_path: self.fallback_path.clone(),
            timeout: self.request_timeout,
        }
    }

    /// Settings for the catalog loader.
    #[must_use]
    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            fallback_policy: self.fallback_policy,
            ..CatalogConfig::default()
        }
    }

    /// Settings for the HTTP auth provider.
    #[must_use]
    pub fn auth_http(&self) -> HttpAuthConfig {
        HttpAuthConfig {
            base_url: self.backend_url.clone(),
            timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        // Act
        let config = config_from(&[]).unwrap();

        // Assert
        assert_eq!(config.backend_url, "http://localhost:5000");
        assert_eq!(config.catalog_path, "/api/scenarios");
        assert_eq!(config.fallback_path, "/api/scenarios");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.fallback_policy, FallbackPolicy::AuthOrNetwork);
        assert_eq!(config.auth_token, None);
        assert!(!config.skip_intro);
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_values_are_read_and_blank_ones_ignored() {
        // Act
        let config = config_from(&[
            ("PARLEY_BACKEND_URL", "https://parley.example"),
            ("PARLEY_FALLBACK_PATH", "/api/public/scenarios"),
            ("PARLEY_REQUEST_TIMEOUT_SECS", "5"),
            ("PARLEY_FALLBACK_POLICY", "auth-only"),
            ("PARLEY_AUTH_TOKEN", "  "),
            ("PARLEY_SKIP_INTRO", "true"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.backend_url, "https://parley.example");
        assert_eq!(config.catalog_http().fallback_path, "/api/public/scenarios");
        assert_eq!(config.auth_http().timeout, Duration::from_secs(5));
        assert_eq!(config.catalog().fallback_policy, FallbackPolicy::AuthOnly);
        assert_eq!(config.auth_token, None);
        assert!(config.skip_intro);
    }

    #[test]
    fn test_malformed_values_are_config_errors() {
        for pairs in [
            [("PARLEY_REQUEST_TIMEOUT_SECS", "soon")],
            [("PARLEY_REQUEST_TIMEOUT_SECS", "0")],
            [("PARLEY_FALLBACK_POLICY", "sometimes")],
            [("PARLEY_SKIP_INTRO", "maybe")],
        ] {
            assert!(
                matches!(config_from(&pairs), Err(AppError::Config(_))),
                "{pairs:?} should be rejected"
            );
        }
    }
}
