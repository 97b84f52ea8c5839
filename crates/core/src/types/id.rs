//! Newtype identity keys for type-safe store lookups.
//!
//! Use the `define_key!` macro to create string-backed key wrappers that
//! prevent accidentally addressing a category store with a product key.

/// Macro to define a type-safe string key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`, `Default`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`, `is_empty()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use catalog_core::define_key;
/// define_key!(BrandId);
/// define_key!(ShelfId);
///
/// let brand = BrandId::new("acme");
/// let shelf = ShelfId::new("acme");
///
/// assert_eq!(brand.as_str(), shelf.as_str());
/// // These are different types, so this won't compile:
/// // let _: BrandId = shelf;
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new key from anything string-like.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Get the underlying key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned key.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the key is the empty sentinel.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(CategoryId);
define_key!(ProductId);

/// Separator between the category and slug halves of a composite product key.
pub const COMPOSITE_SEPARATOR: char = '/';

impl ProductId {
    /// Compose a product key from its owning category and url slug.
    ///
    /// Legacy backends only address products through their category, so the
    /// key has to carry both halves. The slug must not contain
    /// [`COMPOSITE_SEPARATOR`]; use [`ProductId::try_composite`] for slugs
    /// from untrusted payloads.
    #[must_use]
    pub fn composite(category: &CategoryId, url_key: &str) -> Self {
        Self(format!("{category}{COMPOSITE_SEPARATOR}{url_key}"))
    }

    /// Like [`ProductId::composite`], but `None` when the slug is empty or
    /// contains the separator and would not split back apart.
    #[must_use]
    pub fn try_composite(category: &CategoryId, url_key: &str) -> Option<Self> {
        (!url_key.is_empty() && !url_key.contains(COMPOSITE_SEPARATOR))
            .then(|| Self::composite(category, url_key))
    }

    /// Split a composite key back into category and slug.
    ///
    /// Splits on the last separator so category ids may themselves contain
    /// slashes. Returns `None` for flat keys.
    #[must_use]
    pub fn split_composite(&self) -> Option<(CategoryId, &str)> {
        self.0
            .rsplit_once(COMPOSITE_SEPARATOR)
            .filter(|(category, slug)| !category.is_empty() && !slug.is_empty())
            .map(|(category, slug)| (CategoryId::new(category), slug))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_round_trip() {
        let id = ProductId::composite(&CategoryId::new("shoes/running"), "trail-x");
        assert_eq!(id.as_str(), "shoes/running/trail-x");

        let (category, slug) = id.split_composite().unwrap();
        assert_eq!(category.as_str(), "shoes/running");
        assert_eq!(slug, "trail-x");
    }

    #[test]
    fn test_slug_with_separator_is_not_composed() {
        let category = CategoryId::new("shoes");
        assert!(ProductId::try_composite(&category, "trail/x").is_none());
        assert!(ProductId::try_composite(&category, "").is_none());

        let id = ProductId::try_composite(&category, "trail-x").unwrap();
        let (split, slug) = id.split_composite().unwrap();
        assert_eq!(split, category);
        assert_eq!(slug, "trail-x");
    }

    #[test]
    fn test_flat_key_is_not_composite() {
        assert!(ProductId::new("1234").split_composite().is_none());
        assert!(ProductId::new("/slug").split_composite().is_none());
        assert!(ProductId::new("cat/").split_composite().is_none());
    }

    #[test]
    fn test_key_serializes_transparently() {
        let json = serde_json::to_string(&CategoryId::new("c2")).unwrap();
        assert_eq!(json, "\"c2\"");
    }
}
