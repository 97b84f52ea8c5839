//! Catalog Core - Shared types library.
//!
//! This crate provides common types used across the catalog components:
//! - `catalog-client` - Caching data-access layer over the catalog backends
//! - `catalog-cli` - Command-line consumer of the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype identity keys, price coercion and paging windows

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
