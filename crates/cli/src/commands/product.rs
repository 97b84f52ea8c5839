//! Product commands.

use catalog_client::{CatalogService, Direction, QueryConfig};

use super::{CommandError, print_json};

/// Sorting and paging flags of `catalog products`.
#[derive(Debug, Default)]
pub struct Listing {
    pub sort_field: Option<String>,
    pub descending: bool,
    pub size: Option<u64>,
    pub from: Option<u64>,
}

impl Listing {
    fn query_config(&self) -> Option<QueryConfig> {
        let mut config = self
            .sort_field
            .as_deref()
            .map(|field| QueryConfig::sorted_by(field, self.descending))
            .unwrap_or_default();
        config.size = self.size;
        config.from = self.from;

        (config != QueryConfig::default()).then_some(config)
    }
}

/// List the products of a category.
pub async fn list(
    catalog: &CatalogService,
    category: &str,
    listing: &Listing,
) -> Result<(), CommandError> {
    let batch = catalog.get_products(category, listing.query_config()).await?;
    tracing::info!(category = %category, products = batch.len(), "Products loaded");
    print_json(&batch)
}

/// List products by identity.
pub async fn list_by_id(catalog: &CatalogService, ids: Vec<String>) -> Result<(), CommandError> {
    let batch = catalog.get_products_by_id(ids, None).await?;
    print_json(&batch)
}

/// Print one product.
pub async fn show(catalog: &CatalogService, id: &str) -> Result<(), CommandError> {
    let product = catalog.get_product(id).await?;
    if product.is_none() {
        tracing::warn!(product = %id, "Product not found");
    }
    print_json(&product)
}

/// Print the neighbour of a product within its category.
pub async fn neighbour(
    catalog: &CatalogService,
    id: &str,
    direction: Direction,
    wrap_around: bool,
) -> Result<(), CommandError> {
    let Some(product) = catalog.get_product(id).await? else {
        tracing::warn!(product = %id, "Product not found");
        return print_json(&None::<()>);
    };

    let target = match direction {
        Direction::Next => catalog.get_next_product(&product, wrap_around).await?,
        Direction::Previous => catalog.get_previous_product(&product, wrap_around).await?,
    };
    print_json(&target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_without_flags_has_no_config() {
        assert!(Listing::default().query_config().is_none());
    }

    #[test]
    fn test_listing_builds_sort_and_paging() {
        let listing = Listing {
            sort_field: Some("price".to_string()),
            descending: true,
            size: Some(10),
            from: None,
        };
        let config = listing.query_config();

        assert_eq!(
            config.as_ref().and_then(|c| c.sort.clone()),
            Some(json!([{"price": {"order": "desc"}}]))
        );
        assert_eq!(config.and_then(|c| c.size), Some(10));
    }
}
