//! Collaborator interfaces
//!
//! The relatedness core never talks to a database or a remote API itself.
//! It consumes a [`CategoryStore`] for pages and category memberships and an
//! optional [`BlobCache`] for built graphs. In-memory implementations are
//! provided for tests, demos and small corpora.

use crate::errors::{RelatednessError, Result};
use crate::types::{Namespace, Page, PageId};
use dashmap::DashMap;
use rustc_hash::FxHashMap;

/// Source of pages and their category memberships for one or more languages
pub trait CategoryStore: Send + Sync {
    /// All pages of `language`, optionally restricted to one namespace,
    /// in a stable order
    fn pages(&self, language: &str, namespace: Option<Namespace>) -> Result<Vec<Page>>;

    /// Parent categories that `page` is filed under
    fn categories_of(&self, language: &str, page: PageId) -> Result<Vec<PageId>>;
}

/// Keyed blob cache used to avoid rebuilding expensive artifacts
pub trait BlobCache: Send + Sync {
    /// Fetch a blob, `None` on a miss
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a blob under `key`, replacing any previous value
    fn put(&self, key: &str, blob: Vec<u8>) -> Result<()>;
}

/// Category store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCategoryStore {
    pages: FxHashMap<String, Vec<Page>>,
    memberships: FxHashMap<(String, PageId), Vec<PageId>>,
}

impl MemoryCategoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page
    pub fn add_page(&mut self, page: Page) {
        self.pages.entry(page.language.clone()).or_default().push(page);
    }

    /// Add an article page
    pub fn add_article(&mut self, language: &str, id: PageId, title: &str) {
        self.add_page(Page::new(id, language, Namespace::Article, title));
    }

    /// Add a category page
    pub fn add_category(&mut self, language: &str, id: PageId, title: &str) {
        self.add_page(Page::new(id, language, Namespace::Category, title));
    }

    /// File `page` under `category`; repeated filings are collapsed
    pub fn file_under(&mut self, language: &str, page: PageId, category: PageId) {
        let parents = self
            .memberships
            .entry((language.to_string(), page))
            .or_default();
        if !parents.contains(&category) {
            parents.push(category);
        }
    }

    /// Number of pages across all languages
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CategoryStore for MemoryCategoryStore {
    fn pages(&self, language: &str, namespace: Option<Namespace>) -> Result<Vec<Page>> {
        let pages = self
            .pages
            .get(language)
            .ok_or_else(|| RelatednessError::data_access(format!("unknown language '{language}'")))?;
        Ok(pages
            .iter()
            .filter(|p| namespace.map_or(true, |ns| p.namespace == ns))
            .cloned()
            .collect())
    }

    fn categories_of(&self, language: &str, page: PageId) -> Result<Vec<PageId>> {
        Ok(self
            .memberships
            .get(&(language.to_string(), page))
            .cloned()
            .unwrap_or_default())
    }
}

/// Thread-safe in-process blob cache
#[derive(Debug, Default)]
pub struct MemoryBlobCache {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Check if a key is cached
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

impl BlobCache for MemoryBlobCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).map(|b| b.value().clone()))
    }

    fn put(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_filters_namespace() {
        let mut store = MemoryCategoryStore::new();
        store.add_category("en", 1, "Category:Physics");
        store.add_article("en", 2, "Quark");
        store.file_under("en", 2, 1);
        store.file_under("en", 2, 1);

        assert_eq!(store.pages("en", None).unwrap().len(), 2);
        let cats = store.pages("en", Some(Namespace::Category)).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].id, 1);
        assert_eq!(store.categories_of("en", 2).unwrap(), vec![1]);
        assert!(store.categories_of("en", 1).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_unknown_language() {
        let store = MemoryCategoryStore::new();
        let err = store.pages("fr", None).unwrap_err();
        assert!(matches!(err, RelatednessError::DataAccess { .. }));
    }

    #[test]
    fn test_blob_cache_roundtrip() {
        let cache = MemoryBlobCache::new();
        assert!(cache.get("en-CategoryGraph").unwrap().is_none());
        cache.put("en-CategoryGraph", vec![1, 2, 3]).unwrap();
        assert_eq!(cache.get("en-CategoryGraph").unwrap(), Some(vec![1, 2, 3]));
        assert!(cache.contains("en-CategoryGraph"));
    }
}
