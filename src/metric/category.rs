//! Category-graph relatedness
//!
//! Pairwise similarity runs a bidirectional search between the categories of
//! the two pages; most-similar runs a single-source search from one page.
//! Path costs become scores through [`CategoryGraph::distance_to_score`].
//!
//! When the query id is itself a category, the search starts from that
//! category. With `add_pages` disabled, `most_similar` ranks categories
//! instead of member pages.

use super::RelatednessMetric;
use crate::errors::Result;
use crate::graph::{CategoryGraph, CategoryGraphRegistry};
use crate::leaderboard::Leaderboard;
use crate::search::{shortest_distance, CategoryBfs, PathDistance};
use crate::source::CategoryStore;
use crate::types::{PageId, RankedResult, RankedResultList, SearchConfig};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

/// Relatedness from category-graph path cost
pub struct CategoryGraphSimilarity {
    name: String,
    language: String,
    graph: Arc<CategoryGraph>,
    store: Arc<dyn CategoryStore>,
    config: SearchConfig,
    similarity_cache: DashMap<(PageId, PageId), RankedResult>,
    most_similar_cache: DashMap<PageId, RankedResultList>,
}

impl std::fmt::Debug for CategoryGraphSimilarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryGraphSimilarity")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("categories", &self.graph.num_categories())
            .field("config", &self.config)
            .finish()
    }
}

impl CategoryGraphSimilarity {
    /// Create over an already built graph
    pub fn new(graph: Arc<CategoryGraph>, store: Arc<dyn CategoryStore>, config: SearchConfig) -> Self {
        Self {
            name: "category".to_string(),
            language: graph.language().to_string(),
            graph,
            store,
            config,
            similarity_cache: DashMap::new(),
            most_similar_cache: DashMap::new(),
        }
    }

    /// Create using the registry's graph for `language`
    pub fn from_registry(
        registry: &CategoryGraphRegistry,
        language: &str,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let graph = registry.get(language)?;
        Ok(Self::new(graph, Arc::clone(registry.store()), config))
    }

    /// Register under a different name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The graph this metric searches
    pub fn graph(&self) -> &CategoryGraph {
        &self.graph
    }

    /// Drop memoized results
    pub fn clear_cache(&self) {
        self.similarity_cache.clear();
        self.most_similar_cache.clear();
    }

    /// Dense seed categories of a page (or the category itself)
    fn seeds(&self, page: PageId) -> Result<Vec<u32>> {
        if let Some(dense) = self.graph.dense_index(page) {
            return Ok(vec![dense]);
        }
        let mut seeds: Vec<u32> = self
            .store
            .categories_of(&self.language, page)?
            .into_iter()
            .filter_map(|category| self.graph.dense_index(category))
            .collect();
        seeds.sort_unstable();
        seeds.dedup();
        Ok(seeds)
    }

    /// Minimum category path cost between two pages.
    ///
    /// The lower id always seeds the first side, so the result does not
    /// depend on argument order.
    pub fn distance(&self, a: PageId, b: PageId) -> Result<PathDistance> {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let seeds_low = self.seeds(low)?;
        let seeds_high = self.seeds(high)?;
        Ok(shortest_distance(&self.graph, &seeds_low, &seeds_high, &self.config))
    }

    fn compute_similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
        if a == b {
            return Ok(RankedResult::new(b, self.graph.distance_to_score(0.0)));
        }
        let path = self.distance(a, b)?;
        let score = self.graph.distance_to_score(path.distance);
        trace!(a, b, distance = path.distance, score, "category similarity");

        let mut result = RankedResult::new(b, score);
        if self.config.explain {
            if let Some(meeting) = path.meeting {
                result = result.with_explanation(format!(
                    "joined through category '{}' at distance {:.4}",
                    self.graph.title(meeting),
                    path.distance
                ));
            }
        }
        Ok(result)
    }

    fn compute_most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList> {
        let seeds = self.seeds(page)?;
        let mut board = Leaderboard::new(max_results);
        if seeds.is_empty() || max_results == 0 {
            return Ok(board.top());
        }

        if self.config.add_pages {
            let mut bfs = CategoryBfs::from_page(&self.graph, page, &seeds, &self.config)
                .with_max_results(max_results)
                .with_valid_ids(valid_ids);
            bfs.run();
            for (&candidate, &distance) in bfs.page_distances() {
                if candidate != page {
                    board.tally(candidate, self.graph.distance_to_score(distance));
                }
            }
        } else {
            // Categories tied with the k-th one are tallied too; the
            // leaderboard settles the tie by id.
            let mut bfs = CategoryBfs::from_categories(&self.graph, &seeds, &self.config);
            let mut collected = 0;
            let mut cutoff = None;
            while bfs.has_more() {
                let Some(settled) = bfs.step() else { break };
                if cutoff.is_some_and(|c| settled.distance > c) {
                    break;
                }
                let candidate = self.graph.category_id(settled.category);
                if candidate == page || valid_ids.is_some_and(|v| !v.contains(&candidate)) {
                    continue;
                }
                board.tally(candidate, self.graph.distance_to_score(settled.distance));
                collected += 1;
                if collected == max_results {
                    cutoff = Some(settled.distance);
                }
            }
        }
        Ok(board.top())
    }
}

impl RelatednessMetric for CategoryGraphSimilarity {
    fn name(&self) -> &str {
        &self.name
    }

    fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
        if !self.config.cache_results {
            return self.compute_similarity(a, b);
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(cached) = self.similarity_cache.get(&key) {
            let mut result = cached.value().clone();
            result.id = b;
            return Ok(result);
        }
        let result = self.compute_similarity(a, b)?;
        self.similarity_cache.insert(key, result.clone());
        Ok(result)
    }

    fn most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList> {
        // Filtered queries are not memoized.
        if !self.config.cache_results || valid_ids.is_some() {
            return self.compute_most_similar(page, max_results, valid_ids);
        }
        if let Some(cached) = self.most_similar_cache.get(&page) {
            if cached.max_size() >= max_results {
                let mut list = cached.value().clone();
                list.truncate(max_results);
                return Ok(RankedResultList::from_results(list.into_vec(), max_results));
            }
        }
        let list = self.compute_most_similar(page, max_results, None)?;
        self.most_similar_cache.insert(page, list.clone());
        Ok(list)
    }
}
