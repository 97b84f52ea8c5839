//! Product model and product equality.

use catalog_core::{CategoryId, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::store::{Canonical, Patch};

/// Raw product payload as returned by a resolver.
pub type RawProduct = Value;

/// Canonical product handle shared by every caller.
pub type SharedProduct = Canonical<Product>;

/// A decorated product.
///
/// Fields the rest of the system relies on are typed; everything else the
/// backend sent is kept verbatim in `fields`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable identity used as the store key
    pub id: ProductId,
    /// Url slug
    pub url_key: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Price coerced to a decimal
    pub price: Option<Decimal>,
    /// Owning category
    pub category_id: Option<CategoryId>,
    /// Main image, or the configured placeholder
    pub image_url: Option<String>,
    /// Link to the product page
    pub url: Option<String>,
    /// Product attributes
    pub attributes: Map<String, Value>,
    /// Remaining backend fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Product {
    /// Create a product with only an identity.
    #[must_use]
    pub fn new(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Patch for Product {
    fn patch(&mut self, update: Self) {
        self.id = update.id;
        patch_option(&mut self.url_key, update.url_key);
        patch_option(&mut self.name, update.name);
        patch_option(&mut self.price, update.price);
        patch_option(&mut self.category_id, update.category_id);
        patch_option(&mut self.image_url, update.image_url);
        patch_option(&mut self.url, update.url);
        self.attributes.patch(update.attributes);
        self.fields.patch(update.fields);
    }
}

fn patch_option<T>(current: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *current = update;
    }
}

/// Whether two handles denote the same product.
///
/// Products match when they are the same instance, share a non-empty url
/// key, or share a non-empty id, checked in that order. Legacy and search
/// backends disagree on which of these survives in their payloads.
#[must_use]
pub fn same_product(a: &SharedProduct, b: &SharedProduct) -> bool {
    if a.ptr_eq(b) {
        return true;
    }

    let (a_url_key, a_id) = a.with(|p| (p.url_key.clone(), p.id.clone()));
    b.with(|p| {
        let url_key_match = matches!(
            (&a_url_key, &p.url_key),
            (Some(left), Some(right)) if !left.is_empty() && left == right
        );
        url_key_match || (!a_id.is_empty() && a_id == p.id)
    })
}

/// Direction for neighbour lookups within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Find the neighbour of `product` within an ordered batch.
///
/// Returns `None` when `product` is not part of the batch, or when it sits
/// at the edge and `wrap_around` is off.
#[must_use]
pub fn find_neighbour(
    items: &[SharedProduct],
    product: &SharedProduct,
    direction: Direction,
    wrap_around: bool,
) -> Option<SharedProduct> {
    let index = items.iter().position(|item| same_product(item, product))?;
    let last = items.len() - 1;

    let target = match direction {
        Direction::Next if index < last => index + 1,
        Direction::Previous if index > 0 => index - 1,
        Direction::Next if wrap_around => 0,
        Direction::Previous if wrap_around => last,
        Direction::Next | Direction::Previous => return None,
    };

    items.get(target).cloned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shared(id: &str, url_key: Option<&str>) -> SharedProduct {
        Canonical::new(Product {
            url_key: url_key.map(ToString::to_string),
            ..Product::new(id)
        })
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut product = Product {
            name: Some("Runner".to_string()),
            price: Some(Decimal::from(10)),
            ..Product::new("p1")
        };
        product.fields.insert("color".to_string(), json!("red"));

        let mut update = Product {
            price: Some(Decimal::from(12)),
            ..Product::new("p1")
        };
        update.fields.insert("size".to_string(), json!(42));
        product.patch(update);

        assert_eq!(product.name.as_deref(), Some("Runner"));
        assert_eq!(product.price, Some(Decimal::from(12)));
        assert_eq!(product.fields["color"], json!("red"));
        assert_eq!(product.fields["size"], json!(42));
    }

    #[test]
    fn test_same_product_by_identity_url_key_and_id() {
        let a = shared("1", Some("shoe"));
        assert!(same_product(&a, &a.clone()));

        // url key wins even when ids differ
        assert!(same_product(&a, &shared("2", Some("shoe"))));
        // id fallback
        assert!(same_product(&a, &shared("1", None)));
        // empty keys never match
        assert!(!same_product(&shared("", Some("")), &shared("", Some(""))));
        assert!(!same_product(&a, &shared("3", Some("boot"))));
    }

    #[test]
    fn test_neighbours_without_wrap() {
        let items = vec![shared("1", None), shared("2", None), shared("3", None)];

        let next = find_neighbour(&items, &items[0], Direction::Next, false).unwrap();
        assert!(next.ptr_eq(&items[1]));
        assert!(find_neighbour(&items, &items[2], Direction::Next, false).is_none());
        assert!(find_neighbour(&items, &items[0], Direction::Previous, false).is_none());
    }

    #[test]
    fn test_neighbours_with_wrap() {
        let items = vec![shared("1", None), shared("2", None), shared("3", None)];

        let next = find_neighbour(&items, &items[2], Direction::Next, true).unwrap();
        assert!(next.ptr_eq(&items[0]));
        let previous = find_neighbour(&items, &items[0], Direction::Previous, true).unwrap();
        assert!(previous.ptr_eq(&items[2]));
    }

    #[test]
    fn test_neighbour_of_unknown_product() {
        let items = vec![shared("1", None)];
        assert!(find_neighbour(&items, &shared("9", None), Direction::Next, true).is_none());
        assert!(find_neighbour(&[], &shared("9", None), Direction::Next, true).is_none());
    }
}
