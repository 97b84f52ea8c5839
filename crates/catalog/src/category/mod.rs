//! Category tree model, flat index and traversal.
//!
//! A fetched tree is decorated bottom-up into `Arc<Category>` nodes, then
//! walked once top-down to attach parent back-references and fill the
//! [`CategoryTreeIndex`]. Nodes are immutable afterwards.

mod index;
mod walker;

pub use index::CategoryTreeIndex;
pub use walker::TreeWalker;

use std::sync::{Arc, OnceLock, Weak};

use catalog_core::CategoryId;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};

/// Raw category node as assembled by a resolver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawCategory {
    pub id: String,
    pub label: String,
    pub route: Option<String>,
    pub children: Vec<RawCategory>,
    /// Remaining backend fields
    pub fields: Map<String, Value>,
}

impl RawCategory {
    /// Parse a nested JSON category document.
    ///
    /// `id_key` names the identity field (`urlId` on legacy feeds, `id` on
    /// search hits); `id` is used as a fallback. `name` is accepted as a
    /// synonym for `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if a node is not an object or has no identity.
    pub fn from_json(value: Value, id_key: &str) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(CatalogError::Payload(
                "category node is not an object".to_string(),
            ));
        };

        let id = take_key(&mut fields, id_key)
            .or_else(|| take_key(&mut fields, "id"))
            .ok_or_else(|| CatalogError::Payload(format!("category node without '{id_key}'")))?;
        let label = take_string(&mut fields, "label")
            .or_else(|| fields.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        let route = take_string(&mut fields, "route");

        let children = match fields.remove("children") {
            Some(Value::Array(children)) => children
                .into_iter()
                .map(|child| Self::from_json(child, id_key))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            label,
            route,
            children,
            fields,
        })
    }
}

/// Read a string or number field as a string key, removing it from the map.
pub(crate) fn take_key(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

/// A decorated category node.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Identity; empty for the root
    pub id: CategoryId,
    pub label: String,
    pub route: Option<String>,
    /// Category image URL
    pub image: Option<String>,
    /// Link to the category page
    pub url: Option<String>,
    pub is_root: bool,
    pub has_children: bool,
    pub children: Vec<Arc<Category>>,
    #[serde(skip)]
    parent: OnceLock<Weak<Category>>,
    /// Remaining backend fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Category {
    /// Undecorated node carrying the raw fields. Children are not converted.
    #[must_use]
    pub fn from_raw(raw: RawCategory) -> Self {
        Self {
            id: CategoryId::new(raw.id),
            label: raw.label,
            route: raw.route,
            fields: raw.fields,
            ..Self::default()
        }
    }

    /// Parent node, if this node was attached under one and it is alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Record the parent back-reference. The first attachment wins.
    pub(crate) fn attach_parent(&self, parent: &Arc<Self>) -> bool {
        self.parent.set(Arc::downgrade(parent)).is_ok()
    }

    /// Whether `self` appears on `other`'s parent chain.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        let mut current = other.parent();
        while let Some(node) = current {
            if std::ptr::eq(Arc::as_ptr(&node), self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether `other` appears on `self`'s parent chain.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        other.is_ancestor_of(self)
    }

    /// Whether a direct child of `other` shares this node's identity.
    #[must_use]
    pub fn is_child_alias_of(&self, other: &Self) -> bool {
        other.children.iter().any(|child| child.id == self.id)
    }
}

/// Children accessor for walking decorated trees.
#[must_use]
pub fn category_children(node: &Arc<Category>) -> &[Arc<Category>] {
    &node.children
}
