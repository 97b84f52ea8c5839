//! Legacy REST backend.
//!
//! The category tree is a single nested JSON document. Products can only be
//! listed per category, through a JSONP endpoint answering
//! `{"products": [...]}`; there is no lookup by product id.

use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::{CategoryId, ProductId};
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use super::{
    CategoryTreeResolver, ProductBatch, ProductBatchResolver, ProductQuery, ResolvedProduct,
    SingleProductResolver,
};
use crate::category::RawCategory;
use crate::config::LegacyBackendConfig;
use crate::error::{CatalogError, Result};
use crate::product::RawProduct;
use crate::service::CatalogService;
use crate::transport::{HttpMethod, JSONP_PLACEHOLDER, Transport, TransportRequest};

/// Identity field of legacy category nodes.
const CATEGORY_ID_KEY: &str = "urlId";

/// Fetches the nested category document.
pub struct LegacyCategoryTreeResolver {
    transport: Arc<dyn Transport>,
    category_url: Url,
}

impl LegacyCategoryTreeResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &LegacyBackendConfig) -> Self {
        Self {
            transport,
            category_url: config.category_url.clone(),
        }
    }
}

#[async_trait]
impl CategoryTreeResolver for LegacyCategoryTreeResolver {
    #[instrument(skip(self), fields(url = %self.category_url))]
    async fn resolve(&self) -> Result<RawCategory> {
        let response = self
            .transport
            .request(TransportRequest::get(
                HttpMethod::Get,
                self.category_url.as_str(),
            ))
            .await?;
        RawCategory::from_json(response.data, CATEGORY_ID_KEY)
    }
}

/// Lists the products of one category.
pub struct LegacyProductBatchResolver {
    transport: Arc<dyn Transport>,
    api_url: Url,
    store_code: String,
    method: HttpMethod,
}

impl LegacyProductBatchResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &LegacyBackendConfig) -> Self {
        Self {
            transport,
            api_url: config.api_url.clone(),
            store_code: config.store_code.clone(),
            method: config.http_method,
        }
    }

    fn request_for(&self, category: &CategoryId) -> TransportRequest {
        match self.method {
            HttpMethod::Post => TransportRequest::post(
                self.api_url.as_str(),
                json!({ "stid": self.store_code, "cat": category }),
            ),
            HttpMethod::Jsonp | HttpMethod::Get => {
                let mut url = self.api_url.clone();
                url.query_pairs_mut()
                    .append_pair("stid", &self.store_code)
                    .append_pair("cat", category.as_str());
                if self.method == HttpMethod::Jsonp {
                    url.query_pairs_mut()
                        .append_pair("callback", JSONP_PLACEHOLDER);
                }
                TransportRequest::get(self.method, url.as_str())
            }
        }
    }
}

#[async_trait]
impl ProductBatchResolver for LegacyProductBatchResolver {
    #[instrument(skip(self, query), fields(category = ?query.category_id))]
    async fn resolve(&self, query: &ProductQuery) -> Result<ProductBatch<RawProduct>> {
        if query.product_ids.is_some() {
            return Err(CatalogError::UnsupportedQuery(
                "the legacy backend cannot fetch products by id".to_string(),
            ));
        }
        let Some(category) = &query.category_id else {
            return Err(CatalogError::UnsupportedQuery(
                "the legacy backend only lists products per category".to_string(),
            ));
        };

        let response = self.transport.request(self.request_for(category)).await?;
        let products = match response.data {
            Value::Object(mut body) => body.remove("products").unwrap_or(Value::Null),
            other => other,
        };

        match products {
            Value::Array(items) => Ok(ProductBatch::Plain(items)),
            Value::Null => Ok(ProductBatch::Plain(Vec::new())),
            other => Err(CatalogError::Payload(format!(
                "expected a product list, got {other}"
            ))),
        }
    }
}

/// Resolves a composite `{category}/{urlKey}` id through its category batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySingleProductResolver;

#[async_trait]
impl SingleProductResolver for LegacySingleProductResolver {
    #[instrument(skip(self, catalog), fields(product = %id))]
    async fn resolve(
        &self,
        id: &ProductId,
        catalog: &CatalogService,
    ) -> Result<Option<ResolvedProduct>> {
        let Some((category, _)) = id.split_composite() else {
            tracing::debug!("Product id carries no category, cannot resolve");
            return Ok(None);
        };

        catalog.get_products(category.as_str(), None).await?;

        // Only what that batch produced counts; asking the service again
        // would fetch the same batch forever.
        Ok(catalog.cached_product(id).map(ResolvedProduct::Cached))
    }
}
