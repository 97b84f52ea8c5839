//! Paging types shared by resolvers and callers.

use serde::{Deserialize, Serialize};

/// Paging metadata reported by a backend alongside a product batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of hits the backend knows about (before de-duplication).
    pub total: u64,
    /// Requested page size, if the query carried one.
    pub size: Option<u64>,
    /// Requested offset, if the query carried one.
    pub from: Option<u64>,
}

/// A page window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Number of entities per page.
    pub size: i64,
    /// Offset of the first entity on this page.
    ///
    /// May be negative when built from a set smaller than one page.
    pub from: i64,
}

impl PageInfo {
    /// Create a page window.
    #[must_use]
    pub const fn new(size: i64, from: i64) -> Self {
        Self { size, from }
    }

    /// Advance to the following page.
    pub const fn next(&mut self) -> &mut Self {
        self.from += self.size;
        self
    }
}

/// Builds `PageInfo` windows with a configured default page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfoFactory {
    default_page_size: i64,
}

impl PageInfoFactory {
    /// Create a factory for the given default page size.
    #[must_use]
    pub const fn new(default_page_size: i64) -> Self {
        Self { default_page_size }
    }

    /// Page window positioned at the last page of an already loaded set.
    #[must_use]
    pub fn create_page_info(&self, loaded: usize) -> PageInfo {
        let loaded = i64::try_from(loaded).unwrap_or(i64::MAX);
        PageInfo::new(self.default_page_size, loaded - self.default_page_size)
    }

    /// Page window for the first page.
    #[must_use]
    pub const fn create_first_page_info(&self) -> PageInfo {
        PageInfo::new(self.default_page_size, 0)
    }
}

impl Default for PageInfoFactory {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_from_loaded_set() {
        let factory = PageInfoFactory::new(10);
        let mut page = factory.create_page_info(30);
        assert_eq!(page, PageInfo::new(10, 20));

        page.next();
        assert_eq!(page.from, 30);
    }

    #[test]
    fn test_first_page() {
        let page = PageInfoFactory::default().create_first_page_info();
        assert_eq!(page, PageInfo::new(10, 0));
    }
}
