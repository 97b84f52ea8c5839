//! Catalog service: the caching orchestrator in front of the resolvers.
//!
//! One service instance owns all catalog state: the identity store for
//! products, the criteria cache for batch queries and the category tree
//! index. Nothing is global; two services never share objects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use catalog_core::{PageInfo, PageInfoFactory, ProductId};
use moka::future::Cache;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::category::{
    Category, CategoryTreeIndex, RawCategory, TreeWalker, category_children,
};
use crate::config::{BackendKind, CatalogConfig};
use crate::decorate::{
    CategoryDecorator, DefaultCategoryDecorator, LegacyProductDecorator, ProductDecorator,
    SearchProductDecorator,
};
use crate::error::{CatalogError, Result};
use crate::events::{CatalogEvent, ListenerId, ListenerRegistry};
use crate::hash::ContentHasher;
use crate::product::{Direction, Product, SharedProduct, find_neighbour};
use crate::resolver::legacy::{
    LegacyCategoryTreeResolver, LegacyProductBatchResolver, LegacySingleProductResolver,
};
use crate::resolver::search::{
    SearchCategoryTreeResolver, SearchProductBatchResolver, SearchSingleProductResolver,
};
use crate::resolver::{
    CategoryTreeResolver, ProductBatch, ProductBatchResolver, ProductQuery, QueryConfig,
    ResolvedProduct, SingleProductResolver,
};
use crate::store::KeyedObjectStore;
use crate::transport::{HttpTransport, Transport};

/// Per-key guards serializing identical batch queries.
type InFlight = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A caller's claim on the per-key guard of a batch query.
///
/// Dropping the slot, including when the caller's future is cancelled,
/// removes the map entry once no other caller holds it.
struct InFlightSlot<'a> {
    in_flight: &'a InFlight,
    key: &'a str,
    guard: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(in_flight: &'a InFlight, key: &'a str) -> Self {
        let guard = {
            let mut map = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.to_string()).or_default())
        };
        Self {
            in_flight,
            key,
            guard,
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference is ours, one is the map's; anything else is a waiter
        if Arc::strong_count(&self.guard) <= 2 {
            map.remove(self.key);
        }
    }
}

/// Caching data-access layer over a catalog backend.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    category_tree: Arc<dyn CategoryTreeResolver>,
    product_batch: Arc<dyn ProductBatchResolver>,
    single_product: Arc<dyn SingleProductResolver>,
    product_decorator: Arc<dyn ProductDecorator>,
    category_decorator: Arc<dyn CategoryDecorator>,
    hasher: ContentHasher,
    products: KeyedObjectStore<Product>,
    // Unbounded: entries live as long as the service
    criteria: Cache<String, ProductBatch<SharedProduct>>,
    in_flight: InFlight,
    tree: OnceCell<CategoryTreeIndex>,
    page_info: PageInfoFactory,
    listeners: ListenerRegistry,
}

/// Assembles a [`CatalogService`] from resolvers and decorators.
#[derive(Default)]
pub struct CatalogServiceBuilder {
    category_tree: Option<Arc<dyn CategoryTreeResolver>>,
    product_batch: Option<Arc<dyn ProductBatchResolver>>,
    single_product: Option<Arc<dyn SingleProductResolver>>,
    product_decorator: Option<Arc<dyn ProductDecorator>>,
    category_decorator: Option<Arc<dyn CategoryDecorator>>,
    page_info: PageInfoFactory,
}

impl CatalogServiceBuilder {
    #[must_use]
    pub fn category_tree_resolver(mut self, resolver: Arc<dyn CategoryTreeResolver>) -> Self {
        self.category_tree = Some(resolver);
        self
    }

    #[must_use]
    pub fn product_batch_resolver(mut self, resolver: Arc<dyn ProductBatchResolver>) -> Self {
        self.product_batch = Some(resolver);
        self
    }

    #[must_use]
    pub fn single_product_resolver(mut self, resolver: Arc<dyn SingleProductResolver>) -> Self {
        self.single_product = Some(resolver);
        self
    }

    /// Defaults to [`LegacyProductDecorator`] without a placeholder image.
    #[must_use]
    pub fn product_decorator(mut self, decorator: Arc<dyn ProductDecorator>) -> Self {
        self.product_decorator = Some(decorator);
        self
    }

    /// Defaults to [`DefaultCategoryDecorator`] with empty media settings.
    #[must_use]
    pub fn category_decorator(mut self, decorator: Arc<dyn CategoryDecorator>) -> Self {
        self.category_decorator = Some(decorator);
        self
    }

    #[must_use]
    pub const fn default_page_size(mut self, size: i64) -> Self {
        self.page_info = PageInfoFactory::new(size);
        self
    }

    /// Build the service.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Configuration`] if a resolver is missing.
    pub fn build(self) -> Result<CatalogService> {
        let missing = |name: &str| CatalogError::Configuration(format!("missing {name} resolver"));

        Ok(CatalogService {
            inner: Arc::new(CatalogServiceInner {
                category_tree: self.category_tree.ok_or_else(|| missing("category tree"))?,
                product_batch: self.product_batch.ok_or_else(|| missing("product batch"))?,
                single_product: self.single_product.ok_or_else(|| missing("single product"))?,
                product_decorator: self
                    .product_decorator
                    .unwrap_or_else(|| Arc::new(LegacyProductDecorator::default())),
                category_decorator: self
                    .category_decorator
                    .unwrap_or_else(|| Arc::new(DefaultCategoryDecorator::default())),
                hasher: ContentHasher::new(),
                products: KeyedObjectStore::new(),
                criteria: Cache::builder().build(),
                in_flight: Mutex::new(HashMap::new()),
                tree: OnceCell::new(),
                page_info: self.page_info,
                listeners: ListenerRegistry::new(),
            }),
        })
    }
}

impl CatalogService {
    /// Start assembling a service.
    #[must_use]
    pub fn builder() -> CatalogServiceBuilder {
        CatalogServiceBuilder::default()
    }

    /// Create a service for the configured backend over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Configuration`] if the selected backend has
    /// no endpoint configuration.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let token = config.search.as_ref().and_then(|search| search.token.clone());
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new().with_bearer(token));
        Self::from_config_with_transport(config, transport)
    }

    /// Create a service for the configured backend over `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Configuration`] if the selected backend has
    /// no endpoint configuration.
    pub fn from_config_with_transport(
        config: &CatalogConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let builder = Self::builder()
            .default_page_size(config.default_page_size)
            .category_decorator(Arc::new(DefaultCategoryDecorator::new(
                config.media.clone(),
                config.use_shop_urls,
            )));

        let builder = match config.backend {
            BackendKind::Legacy => {
                let legacy = config.legacy.as_ref().ok_or_else(|| {
                    CatalogError::Configuration("legacy backend is not configured".to_string())
                })?;
                builder
                    .category_tree_resolver(Arc::new(LegacyCategoryTreeResolver::new(
                        Arc::clone(&transport),
                        legacy,
                    )))
                    .product_batch_resolver(Arc::new(LegacyProductBatchResolver::new(
                        transport, legacy,
                    )))
                    .single_product_resolver(Arc::new(LegacySingleProductResolver))
                    .product_decorator(Arc::new(LegacyProductDecorator::new(&config.media)))
            }
            BackendKind::Search => {
                let search = config.search.as_ref().ok_or_else(|| {
                    CatalogError::Configuration("search backend is not configured".to_string())
                })?;
                builder
                    .category_tree_resolver(Arc::new(SearchCategoryTreeResolver::new(
                        Arc::clone(&transport),
                        search,
                    )))
                    .product_batch_resolver(Arc::new(SearchProductBatchResolver::new(
                        Arc::clone(&transport),
                        search,
                    )))
                    .single_product_resolver(Arc::new(SearchSingleProductResolver::new(
                        transport, search,
                    )))
                    .product_decorator(Arc::new(SearchProductDecorator::new(&config.media)))
            }
        };

        builder.build()
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Get a category by identity, or the root when `id` is `None`.
    ///
    /// The first call fetches the whole tree; concurrent callers wait for
    /// that same fetch. Returns `Ok(None)` for unknown identities.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fetch fails. A failed fetch is retried
    /// by the next call.
    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Option<&str>) -> Result<Option<Arc<Category>>> {
        let index = self.category_index().await?;
        Ok(match id {
            None => Some(Arc::clone(index.root_category())),
            Some(id) => index.get_category(id),
        })
    }

    async fn category_index(&self) -> Result<&CategoryTreeIndex> {
        self.inner
            .tree
            .get_or_try_init(|| self.fetch_all_categories())
            .await
    }

    async fn fetch_all_categories(&self) -> Result<CategoryTreeIndex> {
        debug!("Fetching category tree");
        let raw = self.inner.category_tree.resolve().await?;

        let root = Arc::new(self.decorate_root(raw));
        let mut index = CategoryTreeIndex::new(Arc::clone(&root));
        self.emit(&CatalogEvent::CategoryCreated(Arc::clone(&root)));

        TreeWalker::new(&root, category_children).walk_children(|category, parent| {
            category.attach_parent(parent);
            index.add_category(Arc::clone(category));
            self.emit(&CatalogEvent::CategoryCreated(Arc::clone(category)));
        });

        debug!(categories = index.len(), "Category tree loaded");
        Ok(index)
    }

    fn decorate_root(&self, mut raw: RawCategory) -> Category {
        let children = std::mem::take(&mut raw.children);
        raw.id = String::new();

        let mut root = Category::from_raw(raw);
        root.is_root = true;
        root.url = Some("/".to_string());
        root.children = self.decorate_children(children);
        root.has_children = !root.children.is_empty();
        root
    }

    fn decorate_category(&self, mut raw: RawCategory) -> Category {
        let children = std::mem::take(&mut raw.children);
        let mut category = self.inner.category_decorator.decorate(raw);
        category.children = self.decorate_children(children);
        category.has_children = !category.children.is_empty();
        category
    }

    fn decorate_children(&self, children: Vec<RawCategory>) -> Vec<Arc<Category>> {
        children
            .into_iter()
            .map(|child| Arc::new(self.decorate_category(child)))
            .collect()
    }

    /// Whether `a` is an ancestor of `b` in the loaded tree.
    #[must_use]
    pub fn is_ancestor_of(&self, a: &Category, b: &Category) -> bool {
        a.is_ancestor_of(b)
    }

    /// Whether `a` is a descendant of `b` in the loaded tree.
    #[must_use]
    pub fn is_descendant_of(&self, a: &Category, b: &Category) -> bool {
        a.is_descendant_of(b)
    }

    /// Whether a direct child of `b` is an alias of `a`.
    #[must_use]
    pub fn is_child_alias_of(&self, a: &Category, b: &Category) -> bool {
        a.is_child_alias_of(b)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products of a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fetch fails.
    pub async fn get_products(
        &self,
        category_id: &str,
        config: Option<QueryConfig>,
    ) -> Result<ProductBatch<SharedProduct>> {
        self.get_products_by_raw_options(ProductQuery::category(category_id).with_config(config))
            .await
    }

    /// Products with the given identities.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedQuery`] if the backend cannot look
    /// products up by id, or any fetch error.
    pub async fn get_products_by_id<I>(
        &self,
        ids: I,
        config: Option<QueryConfig>,
    ) -> Result<ProductBatch<SharedProduct>>
    where
        I: IntoIterator,
        I::Item: Into<ProductId>,
    {
        self.get_products_by_raw_options(ProductQuery::by_ids(ids).with_config(config))
            .await
    }

    /// Fetch the batch for an arbitrary query, through the criteria cache.
    ///
    /// Non-empty results are cached under a hash of `query` for the
    /// lifetime of the service. Empty results and failures are never
    /// cached. Identical concurrent queries share a single backend call.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error unchanged.
    #[instrument(skip(self, query))]
    pub async fn get_products_by_raw_options(
        &self,
        query: ProductQuery,
    ) -> Result<ProductBatch<SharedProduct>> {
        let key = self.inner.hasher.hash_object(&query)?;

        if let Some(batch) = self.inner.criteria.get(&key).await {
            debug!(key = %key, "Criteria cache hit");
            return Ok(batch);
        }

        let slot = InFlightSlot::acquire(&self.inner.in_flight, &key);
        let _turn = slot.guard.lock().await;
        // An identical query may have finished while we waited
        if let Some(batch) = self.inner.criteria.get(&key).await {
            debug!(key = %key, "Criteria cache hit after wait");
            return Ok(batch);
        }
        self.fetch_batch(&key, &query).await
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn fetch_batch(
        &self,
        key: &str,
        query: &ProductQuery,
    ) -> Result<ProductBatch<SharedProduct>> {
        let (raw_items, meta) = self.inner.product_batch.resolve(query).await?.into_parts();

        let decorated = raw_items
            .into_iter()
            .filter_map(|raw| match self.inner.product_decorator.decorate(raw, query) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed product");
                    None
                }
            })
            .collect::<Vec<_>>();

        let stored = self
            .inner
            .products
            .add_or_update_batch(decorated, |product| product.id.as_str().to_string());
        for product in &stored {
            self.emit(&CatalogEvent::ProductCreated(product.clone()));
        }

        let batch = ProductBatch::from_parts(stored, meta);
        if batch.is_empty() {
            debug!(key = %key, "Empty batch, not caching");
        } else {
            self.inner
                .criteria
                .insert(key.to_string(), batch.clone())
                .await;
        }

        Ok(batch)
    }

    /// Whether a non-empty batch is cached for `query`.
    #[must_use]
    pub fn is_query_cached(&self, query: &ProductQuery) -> bool {
        self.inner
            .hasher
            .hash_object(query)
            .is_ok_and(|key| self.inner.criteria.contains_key(&key))
    }

    /// Get a product by identity.
    ///
    /// Products already seen by this service are returned without a fetch.
    /// Returns `Ok(None)` when the backend does not know the product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fetch fails or the payload cannot be
    /// decorated.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<Option<SharedProduct>> {
        let id = ProductId::new(id);
        if let Some(product) = self.cached_product(&id) {
            return Ok(Some(product));
        }

        match self.inner.single_product.resolve(&id, self).await? {
            None => {
                debug!("Product not found");
                Ok(None)
            }
            Some(ResolvedProduct::Cached(product)) => Ok(Some(product)),
            Some(ResolvedProduct::Raw(raw)) => {
                // The owning category is only known from a composite id
                let query = id
                    .split_composite()
                    .map_or_else(ProductQuery::default, |(category, _)| {
                        ProductQuery::category(category)
                    });
                let product = self.inner.product_decorator.decorate(raw, &query)?;
                let product = self
                    .inner
                    .products
                    .add_or_update(id.as_str().to_string(), product);
                self.emit(&CatalogEvent::ProductCreated(product.clone()));
                Ok(Some(product))
            }
        }
    }

    /// The canonical instance for `id`, if this service has seen it.
    #[must_use]
    pub fn cached_product(&self, id: &ProductId) -> Option<SharedProduct> {
        self.inner.products.get(id.as_str())
    }

    /// Whether this service has seen the product `id`.
    #[must_use]
    pub fn is_product_cached(&self, id: &str) -> bool {
        self.inner.products.exists(id)
    }

    /// The product after `product` within its category.
    ///
    /// Returns `Ok(None)` at the end of the category unless `wrap_around`
    /// is set, and when the product has no category or is not part of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the category batch has to be fetched and fails.
    pub async fn get_next_product(
        &self,
        product: &SharedProduct,
        wrap_around: bool,
    ) -> Result<Option<SharedProduct>> {
        self.neighbour(product, Direction::Next, wrap_around).await
    }

    /// The product before `product` within its category.
    ///
    /// # Errors
    ///
    /// Returns an error if the category batch has to be fetched and fails.
    pub async fn get_previous_product(
        &self,
        product: &SharedProduct,
        wrap_around: bool,
    ) -> Result<Option<SharedProduct>> {
        self.neighbour(product, Direction::Previous, wrap_around)
            .await
    }

    async fn neighbour(
        &self,
        product: &SharedProduct,
        direction: Direction,
        wrap_around: bool,
    ) -> Result<Option<SharedProduct>> {
        let Some(category) = product.with(|p| p.category_id.clone()) else {
            debug!("Product has no category, no neighbours");
            return Ok(None);
        };

        let batch = self.get_products(category.as_str(), None).await?;
        Ok(find_neighbour(
            batch.items(),
            product,
            direction,
            wrap_around,
        ))
    }

    // =========================================================================
    // Paging and events
    // =========================================================================

    /// Paging window for an already loaded set, or the first page.
    #[must_use]
    pub fn create_page_info<T>(&self, entities: Option<&[T]>) -> PageInfo {
        entities.map_or_else(
            || self.inner.page_info.create_first_page_info(),
            |entities| self.inner.page_info.create_page_info(entities.len()),
        )
    }

    /// Register a listener for catalog events.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Self, &CatalogEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    fn emit(&self, event: &CatalogEvent) {
        self.inner.listeners.emit(self, event);
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("products", &self.inner.products.len())
            .field("cached_queries", &self.inner.criteria.entry_count())
            .field("tree_loaded", &self.inner.tree.initialized())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}
