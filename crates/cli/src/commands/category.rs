//! Category commands.

use catalog_client::CatalogService;

use super::{CommandError, print_json};

/// Print the whole tree, starting at the root.
pub async fn tree(catalog: &CatalogService) -> Result<(), CommandError> {
    let root = catalog.get_category(None).await?;
    print_json(&root)
}

/// Print one category with its subtree.
pub async fn show(catalog: &CatalogService, id: &str) -> Result<(), CommandError> {
    let category = catalog.get_category(Some(id)).await?;
    if category.is_none() {
        tracing::warn!(category = %id, "Category not found");
    }
    print_json(&category)
}
