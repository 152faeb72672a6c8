//! Per-language graph ownership
//!
//! A [`CategoryGraphRegistry`] is constructed once by the caller and shared
//! by reference with every component that needs a category graph. Graphs
//! are built lazily on first use, served from a [`BlobCache`] when one is
//! configured, and rebuilt (then re-cached) when the cache misses or holds
//! an unreadable blob.

use super::builder::CategoryGraphBuilder;
use super::category::CategoryGraph;
use crate::errors::Result;
use crate::source::{BlobCache, CategoryStore};
use crate::types::CategoryGraphConfig;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lazily built, shared category graphs keyed by language
pub struct CategoryGraphRegistry {
    store: Arc<dyn CategoryStore>,
    cache: Option<Arc<dyn BlobCache>>,
    config: CategoryGraphConfig,
    graphs: DashMap<String, Arc<CategoryGraph>>,
}

impl CategoryGraphRegistry {
    /// Create a registry without a blob cache
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self {
            store,
            cache: None,
            config: CategoryGraphConfig::default(),
            graphs: DashMap::new(),
        }
    }

    /// Use a blob cache for built graphs
    pub fn with_cache(mut self, cache: Arc<dyn BlobCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a custom build config
    pub fn with_config(mut self, config: CategoryGraphConfig) -> Self {
        self.config = config;
        self
    }

    /// The category store graphs are built from
    pub fn store(&self) -> &Arc<dyn CategoryStore> {
        &self.store
    }

    /// Graph for `language`, building or loading it on first use
    pub fn get(&self, language: &str) -> Result<Arc<CategoryGraph>> {
        if let Some(graph) = self.graphs.get(language) {
            return Ok(Arc::clone(graph.value()));
        }
        let graph = Arc::new(self.load_or_build(language)?);
        // Another thread may have finished first; keep whichever landed.
        let entry = self
            .graphs
            .entry(language.to_string())
            .or_insert(graph);
        Ok(Arc::clone(entry.value()))
    }

    /// Drop the in-process graph for `language` (the blob cache is untouched)
    pub fn invalidate(&self, language: &str) -> bool {
        self.graphs.remove(language).is_some()
    }

    /// Languages currently held in memory
    pub fn loaded_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.graphs.iter().map(|e| e.key().clone()).collect();
        languages.sort();
        languages
    }

    fn load_or_build(&self, language: &str) -> Result<CategoryGraph> {
        let key = CategoryGraph::cache_key(language);

        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Ok(Some(blob)) => match CategoryGraph::from_blob(&blob) {
                    Ok(graph) if graph.language() == language => {
                        info!(language, categories = graph.num_categories(), "loaded category graph from cache");
                        return Ok(graph);
                    }
                    Ok(graph) => warn!(
                        language,
                        cached_language = graph.language(),
                        "cached category graph belongs to another language, rebuilding"
                    ),
                    Err(err) => warn!(language, error = %err, "cached category graph unreadable, rebuilding"),
                },
                Ok(None) => debug!(language, "category graph cache miss"),
                Err(err) => warn!(language, error = %err, "category graph cache unavailable, rebuilding"),
            }
        }

        let graph = CategoryGraphBuilder::with_config(self.store.as_ref(), self.config.clone())
            .build(language)?;

        if let Some(cache) = &self.cache {
            match graph.to_blob().and_then(|blob| cache.put(&key, blob)) {
                Ok(()) => debug!(language, "cached category graph"),
                Err(err) => warn!(language, error = %err, "failed to cache category graph"),
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryBlobCache, MemoryCategoryStore};

    fn store() -> Arc<MemoryCategoryStore> {
        let mut store = MemoryCategoryStore::new();
        store.add_category("en", 1, "Category:Physics");
        store.add_category("en", 2, "Category:Quantum mechanics");
        store.add_article("en", 10, "Quark");
        store.file_under("en", 2, 1);
        store.file_under("en", 10, 2);
        Arc::new(store)
    }

    #[test]
    fn test_builds_once_and_shares() {
        let registry = CategoryGraphRegistry::new(store());
        let first = registry.get("en").unwrap();
        let second = registry.get("en").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.loaded_languages(), vec!["en".to_string()]);
    }

    #[test]
    fn test_populates_and_reads_cache() {
        let cache = Arc::new(MemoryBlobCache::new());
        let registry = CategoryGraphRegistry::new(store()).with_cache(cache.clone());
        let built = registry.get("en").unwrap();
        assert!(cache.contains("en-CategoryGraph"));

        // A fresh registry over an empty store must be served from the cache.
        let empty: Arc<dyn CategoryStore> = Arc::new(MemoryCategoryStore::new());
        let cached = CategoryGraphRegistry::new(empty).with_cache(cache);
        let loaded = cached.get("en").unwrap();
        assert_eq!(loaded.costs(), built.costs());
    }

    #[test]
    fn test_corrupt_cache_rebuilds() {
        let cache = Arc::new(MemoryBlobCache::new());
        cache.put("en-CategoryGraph", b"{garbage".to_vec()).unwrap();
        let registry = CategoryGraphRegistry::new(store()).with_cache(cache.clone());
        let graph = registry.get("en").unwrap();
        assert_eq!(graph.num_categories(), 2);
        let blob = cache.get("en-CategoryGraph").unwrap().unwrap();
        assert!(CategoryGraph::from_blob(&blob).is_ok());
    }

    #[test]
    fn test_invalidate() {
        let registry = CategoryGraphRegistry::new(store());
        registry.get("en").unwrap();
        assert!(registry.invalidate("en"));
        assert!(!registry.invalidate("en"));
        assert!(registry.loaded_languages().is_empty());
    }

    #[test]
    fn test_unknown_language_propagates() {
        let registry = CategoryGraphRegistry::new(store());
        assert!(registry.get("de").is_err());
    }
}
