//! Decoration of raw backend payloads into typed domain values.
//!
//! Decorators are pure and synchronous. They coerce backend types and
//! back-fill what the rest of the catalog relies on but the backend left
//! out, such as the owning category that is only known from the query.

use catalog_core::{CategoryId, ProductId, coerce_price};
use serde_json::{Map, Value};

use crate::category::{Category, RawCategory, take_key};
use crate::config::MediaConfig;
use crate::error::{CatalogError, Result};
use crate::product::{Product, RawProduct};
use crate::resolver::ProductQuery;

/// Turns a raw product payload into a [`Product`].
pub trait ProductDecorator: Send + Sync {
    /// Decorate one raw item of the batch produced by `query`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Payload`] if the item has no usable identity.
    fn decorate(&self, raw: RawProduct, query: &ProductQuery) -> Result<Product>;
}

/// Turns a raw category node into a [`Category`].
///
/// Only the node itself is decorated; children are handled by the caller.
pub trait CategoryDecorator: Send + Sync {
    fn decorate(&self, raw: RawCategory) -> Category;
}

/// Decorator for legacy REST payloads.
///
/// Legacy products carry no category and string prices; their identity is
/// composed from the queried category and the url key.
#[derive(Debug, Clone, Default)]
pub struct LegacyProductDecorator {
    placeholder: Option<String>,
}

impl LegacyProductDecorator {
    #[must_use]
    pub fn new(media: &MediaConfig) -> Self {
        Self {
            placeholder: media.placeholder.clone(),
        }
    }
}

impl ProductDecorator for LegacyProductDecorator {
    fn decorate(&self, raw: RawProduct, query: &ProductQuery) -> Result<Product> {
        let mut fields = into_object(raw)?;
        let category_id = query.category_id.clone();
        let url_key = take_string(&mut fields, "urlKey");
        let raw_id = take_key(&mut fields, "id");

        let composite = category_id
            .as_ref()
            .zip(url_key.as_deref())
            .and_then(|(category, url_key)| ProductId::try_composite(category, url_key));
        let id = match composite {
            Some(id) => id,
            None => raw_id
                .map(ProductId::new)
                .ok_or_else(|| CatalogError::Payload("legacy product without identity".to_string()))?,
        };

        let mut product = Product {
            id,
            url_key,
            category_id,
            ..Product::default()
        };
        fill_common(&mut product, fields, self.placeholder.as_deref());
        Ok(product)
    }
}

/// Decorator for search-engine hits.
///
/// Hits wrap the document in `_source`. Attributes are not indexed in a
/// usable form and are always reset.
#[derive(Debug, Clone, Default)]
pub struct SearchProductDecorator {
    placeholder: Option<String>,
}

impl SearchProductDecorator {
    #[must_use]
    pub fn new(media: &MediaConfig) -> Self {
        Self {
            placeholder: media.placeholder.clone(),
        }
    }
}

impl ProductDecorator for SearchProductDecorator {
    fn decorate(&self, raw: RawProduct, query: &ProductQuery) -> Result<Product> {
        let mut hit = into_object(raw)?;
        let mut fields = match hit.remove("_source") {
            Some(source) => into_object(source)?,
            None => hit,
        };

        let id = take_key(&mut fields, "id")
            .map(ProductId::new)
            .ok_or_else(|| CatalogError::Payload("search hit without 'id'".to_string()))?;
        let category_id = take_key(&mut fields, "categoryId")
            .map(CategoryId::new)
            .or_else(|| query.category_id.clone())
            .or_else(|| first_category(&fields));

        fields.remove("attributes");

        let mut product = Product {
            id,
            url_key: take_string(&mut fields, "urlKey"),
            category_id,
            ..Product::default()
        };
        fill_common(&mut product, fields, self.placeholder.as_deref());
        Ok(product)
    }
}

fn fill_common(product: &mut Product, mut fields: Map<String, Value>, placeholder: Option<&str>) {
    product.name = take_string(&mut fields, "name");
    product.price = fields.remove("price").as_ref().and_then(coerce_price);
    product.image_url = take_image(&mut fields).or_else(|| placeholder.map(str::to_string));
    product.url = product.category_id.as_ref().map_or_else(
        || Some(format!("/product/{}", product.id)),
        |category| {
            product
                .url_key
                .as_ref()
                .map(|url_key| format!("/cat/{category}/product/{url_key}"))
        },
    );
    if let Some(Value::Object(attributes)) = fields.remove("attributes") {
        product.attributes = attributes;
    }
    product.fields = fields;
}

fn take_image(fields: &mut Map<String, Value>) -> Option<String> {
    if let Some(image) = take_string(fields, "imageUrl") {
        return Some(image);
    }
    fields
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| match image {
            Value::String(url) => Some(url.clone()),
            Value::Object(image) => image.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
}

fn first_category(fields: &Map<String, Value>) -> Option<CategoryId> {
    let first = fields.get("categories")?.as_array()?.first()?;
    match first.get("id")? {
        Value::String(id) => Some(CategoryId::new(id.as_str())),
        Value::Number(id) => Some(CategoryId::new(id.to_string())),
        _ => None,
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(value) => Some(value),
        other => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CatalogError::Payload(format!(
            "expected a product object, got {other}"
        ))),
    }
}

/// Default category decorator.
///
/// Builds the image URL as `{folder}{id}.{extension}` and the page URL from
/// either the route or the identity.
#[derive(Debug, Clone, Default)]
pub struct DefaultCategoryDecorator {
    media: MediaConfig,
    use_shop_urls: bool,
}

impl DefaultCategoryDecorator {
    #[must_use]
    pub fn new(media: MediaConfig, use_shop_urls: bool) -> Self {
        Self {
            media,
            use_shop_urls,
        }
    }
}

impl CategoryDecorator for DefaultCategoryDecorator {
    fn decorate(&self, raw: RawCategory) -> Category {
        let mut category = Category::from_raw(raw);
        category.image = Some(format!(
            "{}{}.{}",
            self.media.folder, category.id, self.media.img_extension
        ));
        category.url = match (&category.route, self.use_shop_urls) {
            (Some(route), true) => Some(route.clone()),
            _ => Some(format!("/cat/{}", category.id)),
        };
        category
    }
}
