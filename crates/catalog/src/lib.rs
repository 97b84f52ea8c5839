//! Catalog Client - caching data-access layer over e-commerce catalog backends.
//!
//! [`CatalogService`] sits between a storefront UI and a catalog backend.
//! It fetches categories and products through pluggable resolvers, turns
//! raw payloads into typed values through decorators, and keeps:
//!
//! - one canonical instance per product identity, updated in place
//! - a criteria cache of non-empty batch results keyed by query hash
//! - a category tree index, fetched once per service
//!
//! # Modules
//!
//! - [`service`] - The orchestrator and its builder
//! - [`resolver`] - Resolver contracts plus the legacy and search backends
//! - [`decorate`] - Product and category decorators
//! - [`store`] - Identity-preserving object store
//! - [`category`] - Category tree model, index and walker
//! - [`events`] - Listener registry for created objects
//! - [`config`] - Configuration from environment or any option provider

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod category;
pub mod config;
pub mod decorate;
pub mod error;
pub mod events;
pub mod hash;
pub mod product;
pub mod resolver;
pub mod service;
pub mod store;
pub mod transport;

pub use category::{Category, CategoryTreeIndex, RawCategory, TreeWalker};
pub use config::{BackendKind, CatalogConfig, ConfigError, ConfigProvider, EnvConfig};
pub use error::{CatalogError, Result};
pub use events::{CatalogEvent, ListenerId};
pub use hash::ContentHasher;
pub use product::{Direction, Product, RawProduct, SharedProduct};
pub use resolver::{ProductBatch, ProductQuery, QueryConfig, ResolvedProduct};
pub use service::{CatalogService, CatalogServiceBuilder};
pub use store::{Canonical, KeyedObjectStore, Patch};
pub use transport::{HttpMethod, HttpTransport, Transport, TransportRequest, TransportResponse};
