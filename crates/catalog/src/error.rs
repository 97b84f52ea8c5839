//! Error type shared by resolvers, transport and the catalog service.
//!
//! "Not found" is never an error: lookups that can miss return `Ok(None)`
//! so callers can tell an absent product from a failed fetch.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while fetching or caching catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The resolver cannot honor this query shape. Fix the call site;
    /// retrying will not help.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend payload could not be interpreted.
    #[error("Payload error: {0}")]
    Payload(String),

    /// Service wiring or configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload(err.to_string())
    }
}

impl From<ConfigError> for CatalogError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl CatalogError {
    /// Whether the error stems from the call site rather than the network.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::UnsupportedQuery(_) | Self::Configuration(_))
    }
}

/// Result type alias for `CatalogError`.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::UnsupportedQuery("batch by id".to_string());
        assert_eq!(err.to_string(), "Unsupported query: batch by id");

        let err = CatalogError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_configuration_classification() {
        assert!(CatalogError::UnsupportedQuery(String::new()).is_configuration());
        assert!(CatalogError::Configuration(String::new()).is_configuration());
        assert!(!CatalogError::Payload(String::new()).is_configuration());
    }

    #[test]
    fn test_json_error_becomes_payload() {
        let err: CatalogError = serde_json::from_str::<serde_json::Value>("{")
            .map_err(CatalogError::from)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Payload(_)));
    }
}
