//! End-to-end tests for the catalog client.
//!
//! Each test spawns a [`TestBackend`]: an axum server on an ephemeral port
//! that speaks both the legacy REST/JSONP protocol and the search-engine
//! protocol. Tests then drive a real [`CatalogService`] over HTTP and use
//! the request counters to check what the cache layers saved.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p catalog-integration-tests
//! ```
//!
//! [`CatalogService`]: catalog_client::CatalogService

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use catalog_client::CatalogConfig;
use serde_json::{Value, json};

/// Request counters of a running backend.
#[derive(Debug, Default)]
struct BackendState {
    category_requests: AtomicUsize,
    product_requests: AtomicUsize,
}

/// Mock catalog backend serving fixed fixtures.
pub struct TestBackend {
    base_url: String,
    state: Arc<BackendState>,
}

impl TestBackend {
    /// Start a backend on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        init_tracing();

        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/legacy/categories.json", get(legacy_categories))
            .route("/legacy/products", get(legacy_products))
            .route("/search/category/_search", post(search_categories))
            .route("/search/product/_search", post(search_products))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read test backend address");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Test backend stopped");
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Client configuration for the legacy protocol.
    ///
    /// # Panics
    ///
    /// Panics if the fixed options do not form a valid configuration.
    #[must_use]
    pub fn legacy_config(&self) -> CatalogConfig {
        self.config(&[
            (
                "CATALOG_CATEGORY_URL",
                format!("{}/legacy/categories.json", self.base_url),
            ),
            ("CATALOG_API_URL", format!("{}/legacy/products", self.base_url)),
            ("CATALOG_STORE_CODE", "1234".to_string()),
            ("CATALOG_MEDIA_FOLDER", "/media/".to_string()),
            ("CATALOG_MEDIA_PLACEHOLDER", "/media/placeholder.png".to_string()),
        ])
    }

    /// Client configuration for the search protocol.
    ///
    /// # Panics
    ///
    /// Panics if the fixed options do not form a valid configuration.
    #[must_use]
    pub fn search_config(&self) -> CatalogConfig {
        self.config(&[
            ("CATALOG_BACKEND", "search".to_string()),
            ("CATALOG_SEARCH_ENDPOINT", format!("{}/search/", self.base_url)),
        ])
    }

    fn config(&self, pairs: &[(&str, String)]) -> CatalogConfig {
        let options: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        CatalogConfig::from_provider(&options).expect("Invalid test configuration")
    }

    /// Number of category tree requests served.
    #[must_use]
    pub fn category_requests(&self) -> usize {
        self.state.category_requests.load(Ordering::SeqCst)
    }

    /// Number of product requests served.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.product_requests.load(Ordering::SeqCst)
    }
}

fn init_tracing() {
    // Several tests in one binary race to install the subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_client=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Legacy protocol
// =============================================================================

async fn legacy_categories(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.category_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "urlId": "root",
        "label": "Root",
        "children": [
            {
                "urlId": "shoes",
                "label": "Shoes",
                "route": "/shoes",
                "children": [
                    {"urlId": "boots", "label": "Boots", "children": []},
                    {"urlId": "sale", "label": "Sale alias", "children": []}
                ]
            },
            {
                "urlId": "sale",
                "label": "Sale",
                "children": [{"urlId": "outlet", "label": "Outlet", "children": []}]
            }
        ]
    }))
}

fn legacy_fixture(category: &str) -> Value {
    match category {
        "shoes" => json!([
            {"id": 1, "urlKey": "runner", "name": "Runner", "price": "19.90"},
            {"id": 2, "urlKey": "trail", "name": "Trail", "price": "29.90"},
            {"id": 3, "urlKey": "court", "name": "Court", "price": "39.90"}
        ]),
        "boots" => json!([
            {"id": 4, "urlKey": "winter", "name": "Winter", "price": "99.00"}
        ]),
        _ => json!([]),
    }
}

async fn legacy_products(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.product_requests.fetch_add(1, Ordering::SeqCst);

    if params.get("stid").map(String::as_str) != Some("1234") {
        return (StatusCode::FORBIDDEN, "unknown store").into_response();
    }
    let category = params.get("cat").map_or("", String::as_str);
    if category == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response();
    }

    let body = json!({ "products": legacy_fixture(category) });
    match params.get("callback") {
        Some(callback) => format!("{callback}({body});").into_response(),
        None => Json(body).into_response(),
    }
}

// =============================================================================
// Search protocol
// =============================================================================

fn search_categories_fixture() -> Vec<Value> {
    vec![
        json!({"id": 1, "level": 1, "name": "Root", "active": true}),
        json!({"id": 10, "parentId": 1, "level": 2, "name": "Shoes", "active": true}),
        json!({"id": 11, "parentId": 1, "level": 2, "name": "Shirts", "active": true}),
        json!({"id": 20, "parentId": 10, "level": 3, "name": "Boots", "active": true}),
    ]
}

fn search_products_fixture() -> Vec<Value> {
    vec![
        json!({"id": 100, "urlKey": "runner", "name": "Runner", "price": 19.9,
               "categories": [{"id": 10}], "attributes": {"color": "red"}}),
        json!({"id": 101, "urlKey": "trail", "name": "Trail", "price": 29.9,
               "categories": [{"id": 10}]}),
        json!({"id": 102, "urlKey": "oxford", "name": "Oxford", "price": 49.0,
               "categories": [{"id": 11}]}),
    ]
}

fn hits(sources: Vec<Value>) -> Json<Value> {
    let total = sources.len();
    let hits = sources
        .into_iter()
        .map(|source| json!({"_index": "catalog", "_id": source["id"], "_source": source}))
        .collect::<Vec<_>>();
    Json(json!({"hits": {"total": total, "hits": hits}}))
}

async fn search_categories(State(state): State<Arc<BackendState>>) -> Json<Value> {
    state.category_requests.fetch_add(1, Ordering::SeqCst);
    hits(search_categories_fixture())
}

/// Compare a fixture id with an id from a query, which arrives as a string.
fn id_matches(source: &Value, id: &Value) -> bool {
    source["id"].to_string().trim_matches('"') == id.to_string().trim_matches('"')
}

async fn search_products(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    let products = search_products_fixture();
    let filter = &body["query"]["filtered"]["filter"];

    let mut matched: Vec<Value> = if let Some(should) = filter["bool"]["should"].as_array() {
        products
            .into_iter()
            .filter(|p| should.iter().any(|term| id_matches(p, &term["term"]["id"])))
            .collect()
    } else if !filter["term"]["id"].is_null() {
        products
            .into_iter()
            .filter(|p| id_matches(p, &filter["term"]["id"]))
            .collect()
    } else if let Some(category) = body["query"]["nested"]["query"]["match"].get("categories.id") {
        products
            .into_iter()
            .filter(|p| {
                p["categories"]
                    .as_array()
                    .is_some_and(|cats| cats.iter().any(|c| id_matches(c, category)))
            })
            .collect()
    } else {
        products
    };

    if let Some(size) = params
        .get("size")
        .and_then(|size| size.parse::<usize>().ok())
        .or_else(|| body["size"].as_u64().and_then(|s| usize::try_from(s).ok()))
    {
        matched.truncate(size);
    }

    hits(matched)
}
