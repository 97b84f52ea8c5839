//! Catalog client against the search-engine protocol.

#![allow(clippy::unwrap_used)]

use catalog_client::{CatalogService, ProductBatch};
use catalog_integration_tests::TestBackend;
use serde_json::json;

async fn setup() -> (TestBackend, CatalogService) {
    let backend = TestBackend::spawn().await;
    let catalog = CatalogService::from_config(&backend.search_config()).unwrap();
    (backend, catalog)
}

#[tokio::test]
async fn test_tree_is_assembled_from_flat_hits() {
    let (backend, catalog) = setup().await;

    let root = catalog.get_category(None).await.unwrap().unwrap();
    assert!(root.is_root);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].label, "Shoes");

    let boots = catalog.get_category(Some("20")).await.unwrap().unwrap();
    let shoes = catalog.get_category(Some("10")).await.unwrap().unwrap();
    assert!(catalog.is_descendant_of(&boots, &shoes));
    assert!(catalog.is_ancestor_of(&root, &boots));
    assert_eq!(backend.category_requests(), 1);
}

#[tokio::test]
async fn test_category_products_are_paged() {
    let (backend, catalog) = setup().await;

    let batch = catalog.get_products("10", None).await.unwrap();
    let ProductBatch::Paged { items, meta } = &batch else {
        panic!("expected a paged batch");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(meta.total, 2);

    let runner = items[0].snapshot();
    assert_eq!(runner.id.as_str(), "100");
    assert!(runner.attributes.is_empty());
    assert_eq!(runner.category_id.as_ref().map(|c| c.as_str()), Some("10"));

    catalog.get_products("10", None).await.unwrap();
    assert_eq!(backend.product_requests(), 1);
}

#[tokio::test]
async fn test_products_by_id() {
    let (_backend, catalog) = setup().await;

    let batch = catalog.get_products_by_id(["100", "102"], None).await.unwrap();
    let ids: Vec<String> = batch
        .items()
        .iter()
        .map(|p| p.read().id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["100", "102"]);
}

#[tokio::test]
async fn test_single_product_lookup() {
    let (backend, catalog) = setup().await;

    let oxford = catalog.get_product("102").await.unwrap().unwrap();
    assert_eq!(oxford.read().name.as_deref(), Some("Oxford"));
    assert_eq!(oxford.read().category_id.as_ref().map(|c| c.as_str()), Some("11"));
    assert!(catalog.is_product_cached("102"));

    // Served from the identity store from now on
    let again = catalog.get_product("102").await.unwrap().unwrap();
    assert!(again.ptr_eq(&oxford));
    assert_eq!(backend.product_requests(), 1);

    assert!(catalog.get_product("999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_lookup_shares_identity_with_batches() {
    let (_backend, catalog) = setup().await;

    let trail = catalog.get_product("101").await.unwrap().unwrap();
    let batch = catalog.get_products("10", None).await.unwrap();
    assert!(batch.items()[1].ptr_eq(&trail));

    let previous = catalog.get_previous_product(&trail, false).await.unwrap().unwrap();
    assert_eq!(previous.read().id.as_str(), "100");
    assert!(catalog.get_next_product(&trail, false).await.unwrap().is_none());
}

#[tokio::test]
async fn test_raw_query_is_posted_verbatim() {
    let (_backend, catalog) = setup().await;

    let batch = catalog
        .get_products_by_raw_options(catalog_client::ProductQuery::raw(json!({
            "query": {"match_all": {}},
            "size": 2
        })))
        .await
        .unwrap();

    let (items, meta) = batch.into_parts();
    assert_eq!(items.len(), 2);
    assert_eq!(meta.and_then(|m| m.size), Some(2));
}
