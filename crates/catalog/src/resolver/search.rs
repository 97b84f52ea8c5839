//! Search-engine backend.
//!
//! Categories and products live in two `_search` indices. Categories come
//! back flat, carrying `level` and `parentId`, and are assembled into a
//! tree here. Product queries answer with paging metadata.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::{PageMeta, ProductId};
use serde_json::{Map, Value, json};
use tracing::instrument;
use url::Url;

use super::{
    CategoryTreeResolver, ProductBatch, ProductBatchResolver, ProductQuery, ResolvedProduct,
    SingleProductResolver,
};
use crate::category::{RawCategory, take_key};
use crate::config::SearchBackendConfig;
use crate::error::{CatalogError, Result};
use crate::product::RawProduct;
use crate::service::CatalogService;
use crate::transport::{Transport, TransportRequest};

/// Upper bound on the number of categories fetched in one request.
const CATEGORY_FETCH_SIZE: u64 = 100_000;

/// Level of the categories directly below the root.
const FIRST_LEVEL: u64 = 2;

fn index_url(config: &SearchBackendConfig, path: &str) -> Result<Url> {
    let mut url = config
        .endpoint
        .join(path)
        .map_err(|e| CatalogError::Configuration(format!("invalid search endpoint: {e}")))?;
    if config.pretty {
        url.query_pairs_mut().append_pair("pretty", "true");
    }
    Ok(url)
}

/// Extract `hits.hits` and the total hit count from a search response.
fn into_hits(data: Value) -> Result<(Vec<Value>, u64)> {
    let Value::Object(mut body) = data else {
        return Err(CatalogError::Payload("search response is not an object".to_string()));
    };
    let Some(Value::Object(mut hits)) = body.remove("hits") else {
        return Err(CatalogError::Payload("search response without 'hits'".to_string()));
    };

    // Newer engines report `{"value": n, "relation": ..}` instead of a number
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        _ => None,
    };

    match hits.remove("hits") {
        Some(Value::Array(items)) => {
            let total = total.unwrap_or_else(|| u64::try_from(items.len()).unwrap_or(u64::MAX));
            Ok((items, total))
        }
        _ => Ok((Vec::new(), total.unwrap_or(0))),
    }
}

/// A category hit before tree assembly.
struct FlatCategory {
    parent_id: Option<String>,
    level: u64,
    node: RawCategory,
}

impl FlatCategory {
    fn from_hit(hit: Value) -> Result<Self> {
        let source = match hit {
            Value::Object(mut hit) => hit.remove("_source").unwrap_or(Value::Object(hit)),
            other => other,
        };
        let Value::Object(mut fields) = source else {
            return Err(CatalogError::Payload("category hit is not an object".to_string()));
        };

        let id = take_key(&mut fields, "id")
            .ok_or_else(|| CatalogError::Payload("category hit without 'id'".to_string()))?;
        let parent_id = take_key(&mut fields, "parentId");
        let level = fields.get("level").and_then(Value::as_u64).unwrap_or(0);
        // `label` mirrors `name` for callers written against the legacy feed
        let label = fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let route = match fields.remove("route") {
            Some(Value::String(route)) => Some(route),
            _ => None,
        };

        Ok(Self {
            parent_id,
            level,
            node: RawCategory {
                id,
                label,
                route,
                children: Vec::new(),
                fields,
            },
        })
    }
}

/// Assemble flat hits into a tree below a synthetic root.
fn assemble_tree(flat: Vec<FlatCategory>) -> RawCategory {
    let root_id = flat
        .iter()
        .find(|category| category.level == FIRST_LEVEL)
        .and_then(|category| category.parent_id.clone())
        .unwrap_or_default();

    let mut by_parent: HashMap<(String, u64), Vec<RawCategory>> = HashMap::new();
    for category in flat {
        if let Some(parent_id) = category.parent_id {
            by_parent
                .entry((parent_id, category.level))
                .or_default()
                .push(category.node);
        }
    }

    let mut root = RawCategory {
        id: root_id,
        route: Some("/".to_string()),
        ..RawCategory::default()
    };
    attach_children(&mut root, FIRST_LEVEL, &mut by_parent);
    root
}

// Levels strictly increase on the way down, so this terminates even when
// parent ids form a cycle.
fn attach_children(
    parent: &mut RawCategory,
    level: u64,
    by_parent: &mut HashMap<(String, u64), Vec<RawCategory>>,
) {
    let mut children = by_parent
        .remove(&(parent.id.clone(), level))
        .unwrap_or_default();
    for child in &mut children {
        attach_children(child, level + 1, by_parent);
    }
    parent.children = children;
}

/// Fetches active categories from `category/_search`.
pub struct SearchCategoryTreeResolver {
    transport: Arc<dyn Transport>,
    config: SearchBackendConfig,
}

impl SearchCategoryTreeResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &SearchBackendConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl CategoryTreeResolver for SearchCategoryTreeResolver {
    #[instrument(skip(self))]
    async fn resolve(&self) -> Result<RawCategory> {
        let url = index_url(&self.config, "category/_search")?;
        let body = json!({
            "size": CATEGORY_FETCH_SIZE,
            "query": { "filtered": { "filter": { "term": { "active": true } } } }
        });

        let response = self
            .transport
            .request(TransportRequest::post(url.as_str(), body))
            .await?;
        let (hits, _) = into_hits(response.data)?;
        let flat = hits
            .into_iter()
            .map(FlatCategory::from_hit)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(categories = flat.len(), "Assembling category tree");
        Ok(assemble_tree(flat))
    }
}

/// Queries `product/_search`.
pub struct SearchProductBatchResolver {
    transport: Arc<dyn Transport>,
    config: SearchBackendConfig,
}

impl SearchProductBatchResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &SearchBackendConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }
}

/// Translate a product query into a search body.
fn search_body(query: &ProductQuery) -> Value {
    let mut body = Map::new();

    if let Some(ids) = &query.product_ids {
        let should = ids
            .iter()
            .map(|id| json!({ "term": { "id": id } }))
            .collect::<Vec<_>>();
        body.insert(
            "query".to_string(),
            json!({ "filtered": { "filter": { "bool": { "should": should } } } }),
        );
    } else if let Some(category) = &query.category_id {
        body.insert(
            "query".to_string(),
            json!({
                "nested": {
                    "path": "categories",
                    "query": { "match": { "categories.id": category } }
                }
            }),
        );
        if let Some(sort) = query.config.as_ref().and_then(|c| c.sort.clone()) {
            body.insert("sort".to_string(), sort);
        }
    } else if let Some(raw) = &query.raw {
        return raw.clone();
    }

    if let Some(config) = &query.config {
        if let Some(size) = config.size {
            body.insert("size".to_string(), json!(size));
        }
        if let Some(from) = config.from {
            body.insert("from".to_string(), json!(from));
        }
    }

    Value::Object(body)
}

#[async_trait]
impl ProductBatchResolver for SearchProductBatchResolver {
    #[instrument(skip(self, query))]
    async fn resolve(&self, query: &ProductQuery) -> Result<ProductBatch<RawProduct>> {
        if query.product_ids.is_none() && query.category_id.is_none() && query.raw.is_none() {
            return Err(CatalogError::UnsupportedQuery(
                "a product query needs ids, a category or a raw body".to_string(),
            ));
        }

        let url = index_url(&self.config, "product/_search")?;
        let body = search_body(query);
        let meta_size = body.get("size").and_then(Value::as_u64);
        let meta_from = body.get("from").and_then(Value::as_u64);

        let response = self
            .transport
            .request(TransportRequest::post(url.as_str(), body))
            .await?;
        let (items, total) = into_hits(response.data)?;

        Ok(ProductBatch::Paged {
            items,
            meta: PageMeta {
                total,
                size: meta_size,
                from: meta_from,
            },
        })
    }
}

/// Looks a product up by id with a single-hit term query.
pub struct SearchSingleProductResolver {
    transport: Arc<dyn Transport>,
    config: SearchBackendConfig,
}

impl SearchSingleProductResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &SearchBackendConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SingleProductResolver for SearchSingleProductResolver {
    #[instrument(skip(self, _catalog), fields(product = %id))]
    async fn resolve(
        &self,
        id: &ProductId,
        _catalog: &CatalogService,
    ) -> Result<Option<ResolvedProduct>> {
        let mut url = index_url(&self.config, "product/_search")?;
        url.query_pairs_mut().append_pair("size", "1");
        let body = json!({
            "query": { "filtered": { "filter": { "term": { "id": id } } } }
        });

        let response = self
            .transport
            .request(TransportRequest::post(url.as_str(), body))
            .await?;
        let (hits, _) = into_hits(response.data)?;

        Ok(hits.into_iter().next().map(ResolvedProduct::Raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resolver::QueryConfig;
    use crate::transport::TransportResponse;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<TransportRequest>>,
        data: Value,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn request(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(TransportResponse {
                status: 200,
                data: self.data.clone(),
            })
        }
    }

    fn config(pretty: bool) -> SearchBackendConfig {
        SearchBackendConfig {
            endpoint: Url::parse("https://es.example/shop/").unwrap(),
            token: None,
            pretty,
        }
    }

    fn category_hit(id: u64, parent_id: u64, level: u64, name: &str) -> Value {
        json!({"_source": {"id": id, "parentId": parent_id, "level": level, "name": name}})
    }

    #[test]
    fn test_tree_assembly_by_level() {
        let flat = vec![
            category_hit(10, 1, 2, "Shoes"),
            category_hit(11, 1, 2, "Shirts"),
            category_hit(20, 10, 3, "Boots"),
            category_hit(21, 10, 3, "Sneakers"),
            category_hit(30, 20, 4, "Winter boots"),
        ]
        .into_iter()
        .map(|hit| FlatCategory::from_hit(hit).unwrap())
        .collect();

        let root = assemble_tree(flat);
        assert_eq!(root.id, "1");
        assert_eq!(root.route.as_deref(), Some("/"));
        assert_eq!(root.children.len(), 2);

        let shoes = &root.children[0];
        assert_eq!(shoes.label, "Shoes");
        assert_eq!(shoes.fields["name"], json!("Shoes"));
        assert_eq!(shoes.children.len(), 2);
        assert_eq!(shoes.children[0].children[0].id, "30");
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn test_tree_assembly_without_categories() {
        let root = assemble_tree(Vec::new());
        assert!(root.id.is_empty());
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_search_body_shapes() {
        let by_ids = search_body(&ProductQuery::by_ids(["1", "2"]));
        assert_eq!(
            by_ids["query"]["filtered"]["filter"]["bool"]["should"][1],
            json!({"term": {"id": "2"}})
        );

        let config = QueryConfig {
            size: Some(20),
            from: Some(40),
            ..QueryConfig::sorted_by("price", false)
        };
        let by_category = search_body(&ProductQuery::category("7").with_config(Some(config)));
        assert_eq!(
            by_category["query"]["nested"]["query"]["match"]["categories.id"],
            json!("7")
        );
        assert_eq!(by_category["sort"], json!([{"price": {"order": "asc"}}]));
        assert_eq!(by_category["size"], json!(20));
        assert_eq!(by_category["from"], json!(40));

        let raw = json!({"query": {"match_all": {}}});
        assert_eq!(search_body(&ProductQuery::raw(raw.clone())), raw);
    }

    #[tokio::test]
    async fn test_batch_reports_paging_meta() {
        let transport = Arc::new(RecordingTransport {
            data: json!({"hits": {"total": 42, "hits": [{"_source": {"id": 1}}]}}),
            ..RecordingTransport::default()
        });
        let resolver = SearchProductBatchResolver::new(transport.clone(), &config(true));

        let query = ProductQuery::category("7").with_config(Some(QueryConfig {
            size: Some(1),
            ..QueryConfig::default()
        }));
        let batch = resolver.resolve(&query).await.unwrap();

        let (items, meta) = batch.into_parts();
        assert_eq!(items.len(), 1);
        assert_eq!(
            meta,
            Some(PageMeta {
                total: 42,
                size: Some(1),
                from: None
            })
        );
        assert_eq!(
            transport.requests.lock().unwrap()[0].url,
            "https://es.example/shop/product/_search?pretty=true"
        );
    }

    #[tokio::test]
    async fn test_single_product_takes_first_hit() {
        let transport = Arc::new(RecordingTransport {
            data: json!({"hits": {"total": {"value": 0}, "hits": []}}),
            ..RecordingTransport::default()
        });
        let resolver = SearchSingleProductResolver::new(transport.clone(), &config(false));
        let catalog = crate::service::tests::empty_service();

        let found = resolver.resolve(&ProductId::new("9"), &catalog).await.unwrap();
        assert!(found.is_none());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://es.example/shop/product/_search?size=1");
        assert_eq!(
            requests[0].body.as_ref().unwrap()["query"]["filtered"]["filter"]["term"]["id"],
            json!("9")
        );
    }

    #[test]
    fn test_hits_require_hits_object() {
        assert!(into_hits(json!({"error": "boom"})).is_err());
        let (items, total) = into_hits(json!({"hits": {"hits": [1, 2]}})).unwrap();
        assert_eq!((items.len(), total), (2, 2));
    }
}
