//! Advisory notifications about newly decorated catalog objects.
//!
//! Listeners run synchronously on the task that produced the object. They
//! cannot influence the operation that emitted the event: a panicking
//! listener is logged and skipped.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::category::Category;
use crate::product::SharedProduct;
use crate::service::CatalogService;

/// Something the catalog created.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    /// A product was decorated and stored (also emitted for updates)
    ProductCreated(SharedProduct),
    /// A category node was decorated and indexed, root included
    CategoryCreated(Arc<Category>),
}

impl CatalogEvent {
    /// Event name as exposed to external subscribers.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductCreated(_) => "productCreated",
            Self::CategoryCreated(_) => "categoryCreated",
        }
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&CatalogService, &CatalogEvent) + Send + Sync>;

/// Registered event listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CatalogService, &CatalogEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener registered at call time.
    pub fn emit(&self, catalog: &CatalogService, event: &CatalogEvent) {
        // Snapshot so listeners may (un)subscribe without deadlocking
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(catalog, event))).is_err() {
                tracing::warn!(event = event.name(), "Catalog event listener panicked");
            }
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}
