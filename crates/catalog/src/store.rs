//! Identity-preserving in-memory object store.
//!
//! The first object stored under a key becomes its canonical instance.
//! Later updates for that key are patched onto the canonical instance instead
//! of replacing it, so every caller holding a [`Canonical`] handle observes
//! the update and handles compare equal by identity across fetches.
//!
//! Entries are never evicted. The store lives as long as the service that
//! owns it, which means memory grows with every distinct product seen.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Shallow field-wise merge used when an update hits an existing key.
///
/// Fields present in `update` win; fields absent from `update` keep the
/// current value.
pub trait Patch {
    fn patch(&mut self, update: Self);
}

impl Patch for Map<String, Value> {
    fn patch(&mut self, update: Self) {
        self.extend(update);
    }
}

/// Shared handle to the canonical instance stored under a key.
///
/// Cloning the handle never clones the object. Use [`Canonical::ptr_eq`] to
/// ask "is this the same product I already rendered".
pub struct Canonical<T>(Arc<RwLock<T>>);

impl<T> Canonical<T> {
    /// Wrap a freshly created object.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Whether two handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the current state.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        // Writers only ever run `Patch::patch`, which cannot leave an object half-merged
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the current state.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.read())
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.read().clone()
    }
}

impl<T> Clone for Canonical<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Canonical<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Canonical").field(&*self.read()).finish()
    }
}

impl<T: Serialize> Serialize for Canonical<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

/// Mapping from an opaque key to a canonical instance.
pub struct KeyedObjectStore<T> {
    entries: Mutex<HashMap<String, Canonical<T>>>,
}

impl<T: Patch> KeyedObjectStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canonical<T>>> {
        // Every critical section is a single map operation
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `item` under `key`, or patch it onto the existing instance.
    ///
    /// The returned handle is the same instance for every call with the
    /// same key.
    pub fn add_or_update(&self, key: impl Into<String>, item: T) -> Canonical<T> {
        let mut entries = self.entries();
        Self::upsert(&mut entries, key.into(), item)
    }

    /// Apply [`add_or_update`](Self::add_or_update) to every item of a batch.
    ///
    /// When several items of one batch share a key, only the first one is
    /// processed and the rest are dropped. The result keeps input order
    /// without the dropped duplicates.
    pub fn add_or_update_batch<I, F>(&self, items: I, key_of: F) -> Vec<Canonical<T>>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> String,
    {
        let mut seen = HashSet::new();
        let mut entries = self.entries();

        items
            .into_iter()
            .filter_map(|item| {
                let key = key_of(&item);
                if seen.insert(key.clone()) {
                    Some(Self::upsert(&mut entries, key, item))
                } else {
                    tracing::debug!(key = %key, "Dropping duplicate key within batch");
                    None
                }
            })
            .collect()
    }

    fn upsert(entries: &mut HashMap<String, Canonical<T>>, key: String, item: T) -> Canonical<T> {
        match entries.get(&key) {
            Some(existing) => {
                existing.write().patch(item);
                existing.clone()
            }
            None => {
                let canonical = Canonical::new(item);
                entries.insert(key, canonical.clone());
                canonical
            }
        }
    }

    /// Look up the canonical instance for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Canonical<T>> {
        self.entries().get(key).cloned()
    }

    /// Whether an instance exists for `key`.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Number of stored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<T: Patch> Default for KeyedObjectStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
