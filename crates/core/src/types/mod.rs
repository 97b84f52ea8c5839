//! Core types for the catalog client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod page;
pub mod price;

pub use id::*;
pub use page::{PageInfo, PageInfoFactory, PageMeta};
pub use price::{coerce_price, parse_price};
