//! HTTP transport used by the bundled resolvers.
//!
//! Legacy backends are reached through JSONP-style GETs, search backends
//! through POSTs with a JSON body. Both go through the `Transport` trait so
//! resolvers can be exercised against any implementation.

use std::str::FromStr;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{CatalogError, Result};

/// Placeholder in JSONP URLs that is replaced by the callback name.
pub const JSONP_PLACEHOLDER: &str = "JSON_CALLBACK";

/// Callback name substituted for [`JSONP_PLACEHOLDER`].
const JSONP_CALLBACK: &str = "catalog_jsonp_cb";

/// Maximum number of body characters kept in error messages and logs.
const BODY_PREVIEW_CHARS: usize = 500;

/// HTTP method (or JSONP convention) for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// GET whose body is wrapped in a callback invocation.
    #[default]
    Jsonp,
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonp" => Ok(Self::Jsonp),
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

/// A request issued by a resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// GET (or JSONP) request without a body.
    #[must_use]
    pub fn get(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    /// POST request with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A successful response, already parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub data: Value,
}

/// Performs HTTP requests on behalf of the resolvers.
///
/// Implementations own timeouts; the catalog layer imposes none.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success or
    /// the body is not valid JSON.
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    bearer: Option<SecretString>,
}

impl HttpTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a transport reusing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            bearer: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_bearer(mut self, token: Option<SecretString>) -> Self {
        self.bearer = token;
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = match request.method {
            HttpMethod::Jsonp => self
                .client
                .get(request.url.replace(JSONP_PLACEHOLDER, JSONP_CALLBACK)),
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => {
                let builder = self.client.post(&request.url);
                match &request.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %preview(&body),
                "Catalog backend returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let payload = match request.method {
            HttpMethod::Jsonp => strip_jsonp(&body),
            HttpMethod::Get | HttpMethod::Post => body.trim(),
        };

        let data: Value = serde_json::from_str(payload).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&body),
                "Failed to parse catalog backend response"
            );
            CatalogError::Payload(e.to_string())
        })?;

        debug!(status = status.as_u16(), "Catalog backend response received");

        Ok(TransportResponse {
            status: status.as_u16(),
            data,
        })
    }
}

/// Remove a `callback(...)` wrapper from a JSONP body.
///
/// Bodies that are already plain JSON are returned unchanged, so backends
/// that ignore the callback parameter still work.
#[must_use]
pub fn strip_jsonp(body: &str) -> &str {
    let trimmed = body.trim().trim_end_matches(';').trim_end();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open < close => trimmed[open + 1..close].trim(),
        _ => trimmed,
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_jsonp_wrapper() {
        assert_eq!(strip_jsonp("cb({\"a\":1});"), "{\"a\":1}");
        assert_eq!(strip_jsonp("  cb( [1,2] )\n"), "[1,2]");
    }

    #[test]
    fn test_strip_jsonp_passes_plain_json() {
        assert_eq!(strip_jsonp("{\"products\":[]}"), "{\"products\":[]}");
        assert_eq!(strip_jsonp("[]"), "[]");
    }

    #[test]
    fn test_http_method_parsing() {
        assert_eq!("JSONP".parse::<HttpMethod>(), Ok(HttpMethod::Jsonp));
        assert_eq!("post".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert!("put".parse::<HttpMethod>().is_err());
    }
}
