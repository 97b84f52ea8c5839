//! Catalog configuration loaded from a pluggable option provider.
//!
//! # Environment Variables
//!
//! ## Required (legacy backend)
//! - `CATALOG_CATEGORY_URL` - Location of the category tree feed
//! - `CATALOG_API_URL` - Product API endpoint
//! - `CATALOG_STORE_CODE` - Store/tenant identifier
//!
//! ## Required (search backend)
//! - `CATALOG_SEARCH_ENDPOINT` - Search engine base URL (trailing `/`)
//!
//! ## Optional
//! - `CATALOG_BACKEND` - `legacy` or `search` (default: legacy)
//! - `CATALOG_API_HTTP_METHOD` - `jsonp`, `get` or `post` (default: jsonp)
//! - `CATALOG_SEARCH_TOKEN` - Bearer token for the search endpoint
//! - `CATALOG_DEFAULT_PAGE_SIZE` - Page size for paging windows (default: 10)
//! - `CATALOG_MEDIA_FOLDER` - Prefix for category images
//! - `CATALOG_MEDIA_IMG_EXTENSION` - Category image extension (default: png)
//! - `CATALOG_MEDIA_PLACEHOLDER` - Image used when a product has none
//! - `CATALOG_USE_SHOP_URLS` - Build friendly shop URLs (default: false)
//! - `CATALOG_LOGGING_ENABLED` - Ask the search backend for pretty output

use std::collections::HashMap;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::transport::HttpMethod;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration option: {0}")]
    MissingOption(String),
    #[error("Invalid configuration option {0}: {1}")]
    InvalidOption(String, String),
}

/// Source of raw configuration options.
pub trait ConfigProvider {
    /// Look up an option by name.
    fn get(&self, name: &str) -> Option<String>;

    /// Look up an option, falling back to `default` when unset.
    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }
}

/// Reads options from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl ConfigProvider for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Which backend family the resolvers talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Nested category feed plus per-category REST/JSONP product API.
    #[default]
    Legacy,
    /// Elasticsearch-style `_search` endpoints.
    Search,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "rest" => Ok(Self::Legacy),
            "search" | "elasticsearch" => Ok(Self::Search),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Catalog client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Backend family
    pub backend: BackendKind,
    /// Legacy backend endpoints
    pub legacy: Option<LegacyBackendConfig>,
    /// Search backend endpoints
    pub search: Option<SearchBackendConfig>,
    /// Default page size for paging windows
    pub default_page_size: i64,
    /// Media settings used by the decorators
    pub media: MediaConfig,
    /// Build friendly shop URLs instead of route-based ones
    pub use_shop_urls: bool,
}

/// Endpoints for the legacy REST/JSONP backend.
#[derive(Debug, Clone)]
pub struct LegacyBackendConfig {
    /// Location of the nested category tree document
    pub category_url: Url,
    /// Product API endpoint
    pub api_url: Url,
    /// Store/tenant identifier sent as `stid`
    pub store_code: String,
    /// HTTP method used for product queries
    pub http_method: HttpMethod,
}

/// Endpoints for the search-engine backend.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct SearchBackendConfig {
    /// Base URL, `category/_search` and `product/_search` are joined onto it
    pub endpoint: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Request pretty-printed responses (debugging aid)
    pub pretty: bool,
}

impl std::fmt::Debug for SearchBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchBackendConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("pretty", &self.pretty)
            .finish()
    }
}

/// Media settings for category images and product placeholders.
#[derive(Debug, Clone, Default)]
pub struct MediaConfig {
    /// Prefix prepended to category ids to build image URLs
    pub folder: String,
    /// Image file extension, without the dot
    pub img_extension: String,
    /// Placeholder image for products without media
    pub placeholder: Option<String>,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required options are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_provider(&EnvConfig)
    }

    /// Load configuration from any option provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required options are missing or invalid.
    pub fn from_provider(provider: &impl ConfigProvider) -> Result<Self, ConfigError> {
        let backend = parse_option::<BackendKind>(provider, "CATALOG_BACKEND", "legacy")?;

        let (legacy, search) = match backend {
            BackendKind::Legacy => (Some(LegacyBackendConfig::from_provider(provider)?), None),
            BackendKind::Search => (None, Some(SearchBackendConfig::from_provider(provider)?)),
        };

        let default_page_size =
            parse_option::<i64>(provider, "CATALOG_DEFAULT_PAGE_SIZE", "10")?;
        if default_page_size <= 0 {
            return Err(ConfigError::InvalidOption(
                "CATALOG_DEFAULT_PAGE_SIZE".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            backend,
            legacy,
            search,
            default_page_size,
            media: MediaConfig::from_provider(provider),
            use_shop_urls: parse_flag(provider, "CATALOG_USE_SHOP_URLS")?,
        })
    }
}

impl LegacyBackendConfig {
    fn from_provider(provider: &impl ConfigProvider) -> Result<Self, ConfigError> {
        Ok(Self {
            category_url: required_url(provider, "CATALOG_CATEGORY_URL")?,
            api_url: required_url(provider, "CATALOG_API_URL")?,
            store_code: required(provider, "CATALOG_STORE_CODE")?,
            http_method: parse_option(provider, "CATALOG_API_HTTP_METHOD", "jsonp")?,
        })
    }
}

impl SearchBackendConfig {
    fn from_provider(provider: &impl ConfigProvider) -> Result<Self, ConfigError> {
        let endpoint = required_url(provider, "CATALOG_SEARCH_ENDPOINT")?;
        if !endpoint.path().ends_with('/') {
            return Err(ConfigError::InvalidOption(
                "CATALOG_SEARCH_ENDPOINT".to_string(),
                "must end with '/'".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            token: provider.get("CATALOG_SEARCH_TOKEN").map(SecretString::from),
            pretty: parse_flag(provider, "CATALOG_LOGGING_ENABLED")?,
        })
    }
}

impl MediaConfig {
    fn from_provider(provider: &impl ConfigProvider) -> Self {
        Self {
            folder: provider.get_or("CATALOG_MEDIA_FOLDER", ""),
            img_extension: provider.get_or("CATALOG_MEDIA_IMG_EXTENSION", "png"),
            placeholder: provider.get("CATALOG_MEDIA_PLACEHOLDER"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn required(provider: &impl ConfigProvider, name: &str) -> Result<String, ConfigError> {
    provider
        .get(name)
        .ok_or_else(|| ConfigError::MissingOption(name.to_string()))
}

fn required_url(provider: &impl ConfigProvider, name: &str) -> Result<Url, ConfigError> {
    let raw = required(provider, name)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidOption(name.to_string(), e.to_string()))
}

fn parse_option<T>(
    provider: &impl ConfigProvider,
    name: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    provider
        .get_or(name, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidOption(name.to_string(), e.to_string()))
}

fn parse_flag(provider: &impl ConfigProvider, name: &str) -> Result<bool, ConfigError> {
    match provider.get_or(name, "false").trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidOption(
            name.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_legacy_config_defaults() {
        let config = CatalogConfig::from_provider(&provider(&[
            ("CATALOG_CATEGORY_URL", "https://shop.example/categories.json"),
            ("CATALOG_API_URL", "https://shop.example/api/products"),
            ("CATALOG_STORE_CODE", "1234"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Legacy);
        assert_eq!(config.default_page_size, 10);
        assert!(!config.use_shop_urls);
        assert_eq!(config.media.img_extension, "png");

        let legacy = config.legacy.unwrap();
        assert_eq!(legacy.store_code, "1234");
        assert_eq!(legacy.http_method, HttpMethod::Jsonp);
        assert!(config.search.is_none());
    }

    #[test]
    fn test_missing_option_is_reported() {
        let err = CatalogConfig::from_provider(&provider(&[(
            "CATALOG_CATEGORY_URL",
            "https://shop.example/categories.json",
        )]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::MissingOption(ref name) if name == "CATALOG_API_URL"));
    }

    #[test]
    fn test_search_config() {
        let config = CatalogConfig::from_provider(&provider(&[
            ("CATALOG_BACKEND", "search"),
            ("CATALOG_SEARCH_ENDPOINT", "https://es.example/shop/"),
            ("CATALOG_SEARCH_TOKEN", "token-value"),
            ("CATALOG_LOGGING_ENABLED", "true"),
            ("CATALOG_DEFAULT_PAGE_SIZE", "24"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Search);
        assert_eq!(config.default_page_size, 24);
        let search = config.search.unwrap();
        assert!(search.pretty);
        assert!(search.token.is_some());
    }

    #[test]
    fn test_search_endpoint_needs_trailing_slash() {
        let err = CatalogConfig::from_provider(&provider(&[
            ("CATALOG_BACKEND", "search"),
            ("CATALOG_SEARCH_ENDPOINT", "https://es.example/shop"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidOption(_, _)));
    }

    #[test]
    fn test_invalid_flag_and_page_size() {
        let base = [
            ("CATALOG_CATEGORY_URL", "https://shop.example/c.json"),
            ("CATALOG_API_URL", "https://shop.example/p"),
            ("CATALOG_STORE_CODE", "1"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("CATALOG_USE_SHOP_URLS", "maybe"));
        assert!(CatalogConfig::from_provider(&provider(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("CATALOG_DEFAULT_PAGE_SIZE", "0"));
        assert!(CatalogConfig::from_provider(&provider(&pairs)).is_err());
    }

    #[test]
    fn test_search_config_debug_redacts_token() {
        let config = SearchBackendConfig {
            endpoint: Url::parse("https://es.example/").unwrap(),
            token: Some(SecretString::from("super_secret_search_token")),
            pretty: false,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("es.example"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_search_token"));
    }
}
