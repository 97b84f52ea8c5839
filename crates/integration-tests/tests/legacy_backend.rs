//! Catalog client against the legacy REST/JSONP protocol.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use catalog_client::{CatalogError, CatalogService, ProductBatch, ProductQuery, QueryConfig};
use catalog_integration_tests::TestBackend;

async fn setup() -> (TestBackend, CatalogService) {
    let backend = TestBackend::spawn().await;
    let catalog = CatalogService::from_config(&backend.legacy_config()).unwrap();
    (backend, catalog)
}

#[tokio::test]
async fn test_category_tree_is_fetched_once() {
    let (backend, catalog) = setup().await;

    let (root, shoes, boots) = tokio::join!(
        catalog.get_category(None),
        catalog.get_category(Some("shoes")),
        catalog.get_category(Some("boots"))
    );
    let root = root.unwrap().unwrap();
    let shoes = shoes.unwrap().unwrap();
    let boots = boots.unwrap().unwrap();

    assert_eq!(backend.category_requests(), 1);
    assert!(root.is_root);
    assert_eq!(root.children.len(), 2);
    assert_eq!(shoes.image.as_deref(), Some("/media/shoes.png"));
    assert!(catalog.is_ancestor_of(&root, &boots));
    assert!(catalog.is_descendant_of(&boots, &shoes));

    // "sale" is listed twice; the entry with children wins
    let sale = catalog.get_category(Some("sale")).await.unwrap().unwrap();
    assert_eq!(sale.label, "Sale");
    assert!(catalog.is_child_alias_of(&sale, &shoes));

    let again = catalog.get_category(None).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&root, &again));
    assert_eq!(backend.category_requests(), 1);
}

#[tokio::test]
async fn test_products_come_back_decorated_and_cached() {
    let (backend, catalog) = setup().await;

    let batch = catalog.get_products("shoes", None).await.unwrap();
    assert!(matches!(batch, ProductBatch::Plain(_)));
    assert_eq!(batch.len(), 3);

    let runner = batch.items()[0].snapshot();
    assert_eq!(runner.id.as_str(), "shoes/runner");
    assert_eq!(runner.price.map(|p| p.to_string()).as_deref(), Some("19.90"));
    assert_eq!(runner.image_url.as_deref(), Some("/media/placeholder.png"));
    assert_eq!(runner.category_id.as_ref().map(|c| c.as_str()), Some("shoes"));

    let again = catalog.get_products("shoes", None).await.unwrap();
    assert!(again.items()[0].ptr_eq(&batch.items()[0]));
    assert_eq!(backend.product_requests(), 1);
}

#[tokio::test]
async fn test_empty_category_is_asked_again() {
    let (backend, catalog) = setup().await;

    assert!(catalog.get_products("outlet", None).await.unwrap().is_empty());
    assert!(catalog.get_products("outlet", None).await.unwrap().is_empty());

    assert_eq!(backend.product_requests(), 2);
    assert!(!catalog.is_query_cached(&ProductQuery::category("outlet")));
}

#[tokio::test]
async fn test_single_product_goes_through_its_category() {
    let (backend, catalog) = setup().await;

    let trail = catalog.get_product("shoes/trail").await.unwrap().unwrap();
    assert_eq!(trail.read().name.as_deref(), Some("Trail"));
    assert_eq!(backend.product_requests(), 1);

    // Unknown slug in a category that was already fetched
    assert!(catalog.get_product("shoes/missing").await.unwrap().is_none());
    assert_eq!(backend.product_requests(), 1);

    let same = catalog.get_product("shoes/trail").await.unwrap().unwrap();
    assert!(same.ptr_eq(&trail));
}

#[tokio::test]
async fn test_neighbours_within_category() {
    let (backend, catalog) = setup().await;

    let runner = catalog.get_product("shoes/runner").await.unwrap().unwrap();
    let court = catalog.get_product("shoes/court").await.unwrap().unwrap();

    let next = catalog.get_next_product(&runner, false).await.unwrap().unwrap();
    assert_eq!(next.read().id.as_str(), "shoes/trail");
    assert!(catalog.get_next_product(&court, false).await.unwrap().is_none());
    let wrapped = catalog.get_next_product(&court, true).await.unwrap().unwrap();
    assert!(wrapped.ptr_eq(&runner));
    let wrapped = catalog.get_previous_product(&runner, true).await.unwrap().unwrap();
    assert!(wrapped.ptr_eq(&court));

    assert_eq!(backend.product_requests(), 1);
}

#[tokio::test]
async fn test_sorted_query_is_a_separate_cache_entry() {
    let (backend, catalog) = setup().await;

    let plain = catalog.get_products("shoes", None).await.unwrap();
    let sorted = catalog
        .get_products("shoes", Some(QueryConfig::sorted_by("price", true)))
        .await
        .unwrap();

    assert_eq!(backend.product_requests(), 2);
    assert!(plain.items()[2].ptr_eq(&sorted.items()[2]));
}

#[tokio::test]
async fn test_batch_by_id_is_unsupported() {
    let (backend, catalog) = setup().await;

    let err = catalog.get_products_by_id(["shoes/runner"], None).await.unwrap_err();
    assert!(matches!(err, CatalogError::UnsupportedQuery(_)));
    assert_eq!(backend.product_requests(), 0);
}

#[tokio::test]
async fn test_backend_error_is_not_cached() {
    let (backend, catalog) = setup().await;

    let err = catalog.get_products("broken", None).await.unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 500, .. }));
    assert!(catalog.get_products("broken", None).await.is_err());
    assert_eq!(backend.product_requests(), 2);
}
