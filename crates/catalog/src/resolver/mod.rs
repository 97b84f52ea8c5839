//! Backend resolvers.
//!
//! Resolvers fetch raw payloads and nothing else: decoration, identity
//! stores and caching all live in [`CatalogService`]. Two backend families
//! are bundled, see [`legacy`] and [`search`].

pub mod legacy;
pub mod search;

use async_trait::async_trait;
use catalog_core::{CategoryId, PageMeta, ProductId};
use serde::Serialize;
use serde_json::Value;

use crate::category::RawCategory;
use crate::error::Result;
use crate::product::{RawProduct, SharedProduct};
use crate::service::CatalogService;

/// Sorting and paging options for a product query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Backend sort clause, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
}

impl QueryConfig {
    /// Sort ascending or descending on a single field.
    #[must_use]
    pub fn sorted_by(field: &str, descending: bool) -> Self {
        let order = if descending { "desc" } else { "asc" };
        Self {
            sort: Some(serde_json::json!([{ field: { "order": order } }])),
            ..Self::default()
        }
    }
}

/// Options for a product batch query.
///
/// The serialized form is hashed into the criteria cache key, so two equal
/// queries always share one cache entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ids: Option<Vec<ProductId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<QueryConfig>,
    /// Backend-native query body, for callers that need more than the above
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ProductQuery {
    /// All products of a category.
    #[must_use]
    pub fn category(category_id: impl Into<CategoryId>) -> Self {
        Self {
            category_id: Some(category_id.into()),
            ..Self::default()
        }
    }

    /// Products with the given identities.
    #[must_use]
    pub fn by_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ProductId>,
    {
        Self {
            product_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A backend-native query.
    #[must_use]
    pub fn raw(body: Value) -> Self {
        Self {
            raw: Some(body),
            ..Self::default()
        }
    }

    /// Attach sorting and paging options.
    #[must_use]
    pub fn with_config(mut self, config: Option<QueryConfig>) -> Self {
        self.config = config;
        self
    }
}

/// A product batch in the shape the backend answered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductBatch<T> {
    /// Bare list
    Plain(Vec<T>),
    /// List with paging metadata
    Paged { items: Vec<T>, meta: PageMeta },
}

impl<T> ProductBatch<T> {
    /// Items in backend order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Plain(items) | Self::Paged { items, .. } => items,
        }
    }

    /// Split into items and optional paging metadata.
    #[must_use]
    pub fn into_parts(self) -> (Vec<T>, Option<PageMeta>) {
        match self {
            Self::Plain(items) => (items, None),
            Self::Paged { items, meta } => (items, Some(meta)),
        }
    }

    /// Rebuild a batch, keeping the shape implied by `meta`.
    #[must_use]
    pub fn from_parts(items: Vec<T>, meta: Option<PageMeta>) -> Self {
        match meta {
            Some(meta) => Self::Paged { items, meta },
            None => Self::Plain(items),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

/// Outcome of a single-product lookup.
#[derive(Debug, Clone)]
pub enum ResolvedProduct {
    /// Raw payload that still needs decoration
    Raw(RawProduct),
    /// Product already canonical in the service's store
    Cached(SharedProduct),
}

/// Fetches the complete category tree.
#[async_trait]
pub trait CategoryTreeResolver: Send + Sync {
    /// Fetch the tree root. The root's own identity is not significant.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the payload is malformed.
    async fn resolve(&self) -> Result<RawCategory>;
}

/// Fetches product batches.
#[async_trait]
pub trait ProductBatchResolver: Send + Sync {
    /// Fetch the batch described by `query`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedQuery`](crate::CatalogError::UnsupportedQuery)
    /// for query shapes the backend cannot answer, or any fetch error.
    async fn resolve(&self, query: &ProductQuery) -> Result<ProductBatch<RawProduct>>;
}

/// Fetches one product by identity.
#[async_trait]
pub trait SingleProductResolver: Send + Sync {
    /// Resolve `id`, or `Ok(None)` when the backend does not know it.
    ///
    /// Implementations may go through `catalog` to fetch the owning batch.
    /// They must not fetch that batch a second time once it came back
    /// without the product.
    ///
    /// # Errors
    ///
    /// Returns any fetch error.
    async fn resolve(
        &self,
        id: &ProductId,
        catalog: &CatalogService,
    ) -> Result<Option<ResolvedProduct>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hash::ContentHasher;
    use serde_json::json;

    #[test]
    fn test_query_serialization_skips_absent_fields() {
        let query = ProductQuery::category("shoes");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"categoryId": "shoes"})
        );

        let query = ProductQuery::by_ids(["1", "2"]).with_config(Some(QueryConfig::sorted_by("price", true)));
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "productIds": ["1", "2"],
                "config": {"sort": [{"price": {"order": "desc"}}]}
            })
        );
    }

    #[test]
    fn test_equal_queries_share_a_key() {
        let hasher = ContentHasher::new();
        let a = hasher.hash_object(&ProductQuery::category("shoes")).unwrap();
        let b = hasher.hash_object(&ProductQuery::category("shoes")).unwrap();
        let c = hasher
            .hash_object(&ProductQuery::category("shoes").with_config(Some(QueryConfig::sorted_by("name", false))))
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_batch_shapes() {
        let plain = ProductBatch::Plain(vec![1, 2]);
        assert_eq!(serde_json::to_value(&plain).unwrap(), json!([1, 2]));
        assert_eq!(plain.into_parts(), (vec![1, 2], None));

        let meta = PageMeta {
            total: 10,
            size: Some(2),
            from: Some(0),
        };
        let paged = ProductBatch::from_parts(vec![1, 2], Some(meta));
        assert_eq!(paged.len(), 2);
        assert_eq!(
            serde_json::to_value(&paged).unwrap(),
            json!({"items": [1, 2], "meta": {"total": 10, "size": 2, "from": 0}})
        );
        assert!(ProductBatch::<i32>::Plain(vec![]).is_empty());
    }
}
