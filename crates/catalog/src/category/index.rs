use std::collections::HashMap;
use std::sync::Arc;

use super::Category;

/// Flat lookup from category identity to tree node.
///
/// Built once per completed tree fetch. Backends sometimes list the same
/// category under several parents; when identities collide, a node with
/// children replaces one without, whatever the insertion order.
#[derive(Debug)]
pub struct CategoryTreeIndex {
    root: Arc<Category>,
    by_id: HashMap<String, Arc<Category>>,
}

impl CategoryTreeIndex {
    /// Create an index holding only `root`.
    #[must_use]
    pub fn new(root: Arc<Category>) -> Self {
        Self {
            root,
            by_id: HashMap::new(),
        }
    }

    /// Insert a node under its identity, applying alias precedence.
    pub fn add_category(&mut self, category: Arc<Category>) {
        let key = category.id.as_str().to_string();
        match self.by_id.get(&key) {
            Some(existing) if category.children.is_empty() => {
                tracing::trace!(
                    category = %key,
                    kept_children = existing.children.len(),
                    "Ignoring childless category alias"
                );
            }
            _ => {
                self.by_id.insert(key, category);
            }
        }
    }

    /// Look up a node. An empty identity denotes the root.
    #[must_use]
    pub fn get_category(&self, id: &str) -> Option<Arc<Category>> {
        if id.is_empty() {
            return Some(Arc::clone(&self.root));
        }
        self.by_id.get(id).cloned()
    }

    /// The root node.
    #[must_use]
    pub const fn root_category(&self) -> &Arc<Category> {
        &self.root
    }

    /// Number of indexed non-root nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether only the root is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
