//! Category graph builder
//!
//! Builds a [`CategoryGraph`] from a [`CategoryStore`] in four passes:
//!
//! 1. enumerate the category namespace and assign dense indices;
//! 2. count parent, child and member-page links per category;
//! 3. allocate exact-size adjacency vectors and fill them back to front,
//!    decrementing a per-category counter for every edge written;
//! 4. propagate rank credit and turn ranks into traversal costs.
//!
//! A counter that does not end at exactly zero means the store answered
//! differently between passes, and the build is aborted.

use super::category::{CategoryGraph, GraphParts};
use super::cost::{ranks_to_costs, seed_ranks, RankPropagation};
use crate::errors::{RelatednessError, Result};
use crate::source::CategoryStore;
use crate::types::{normalize_category_title, CategoryGraphConfig, Namespace, PageId, PropagationDirection};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, info_span};

/// Builds category graphs for one store
pub struct CategoryGraphBuilder<'a> {
    store: &'a dyn CategoryStore,
    config: CategoryGraphConfig,
}

/// Exact-size adjacency slots and the counters used to fill them
struct Slots<T> {
    lists: Vec<Vec<T>>,
    remaining: Vec<usize>,
}

impl<T: Copy + Default> Slots<T> {
    fn with_counts(counts: &[usize]) -> Self {
        Self {
            lists: counts.iter().map(|&n| vec![T::default(); n]).collect(),
            remaining: counts.to_vec(),
        }
    }

    /// Write `value` into the next free slot of `owner`, filling from the end
    fn fill(&mut self, owner: u32, value: T, what: &str) -> Result<()> {
        let owner = owner as usize;
        let remaining = &mut self.remaining[owner];
        if *remaining == 0 {
            return Err(RelatednessError::graph_invariant(format!(
                "category {owner} received more {what} links than were counted"
            )));
        }
        *remaining -= 1;
        self.lists[owner][*remaining] = value;
        Ok(())
    }

    fn finish(self, what: &str) -> Result<Vec<Vec<T>>> {
        if let Some((owner, left)) = self
            .remaining
            .iter()
            .enumerate()
            .find(|(_, &left)| left != 0)
        {
            return Err(RelatednessError::graph_invariant(format!(
                "category {owner} has {left} unfilled {what} slots"
            )));
        }
        Ok(self.lists)
    }
}

impl<'a> CategoryGraphBuilder<'a> {
    /// Create a builder with the default config
    pub fn new(store: &'a dyn CategoryStore) -> Self {
        Self {
            store,
            config: CategoryGraphConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(store: &'a dyn CategoryStore, config: CategoryGraphConfig) -> Self {
        Self { store, config }
    }

    /// Build the graph for `language`
    pub fn build(&self, language: &str) -> Result<CategoryGraph> {
        self.config.validate()?;
        let _span = info_span!("category_graph_build", language).entered();

        let categories = self.store.pages(language, Some(Namespace::Category))?;
        if categories.is_empty() {
            return Err(RelatednessError::graph_invariant(format!(
                "language '{language}' has no category pages"
            )));
        }

        let mut index: FxHashMap<PageId, u32> =
            FxHashMap::with_capacity_and_hasher(categories.len(), Default::default());
        let mut category_ids = Vec::with_capacity(categories.len());
        let mut titles = Vec::with_capacity(categories.len());
        for category in &categories {
            if index.contains_key(&category.id) {
                continue;
            }
            index.insert(category.id, category_ids.len() as u32);
            category_ids.push(category.id);
            titles.push(category.bare_title());
        }
        let n = category_ids.len();
        debug!(categories = n, "assigned dense category indices");

        let all_pages = self.store.pages(language, None)?;

        // Counting pass.
        let mut parent_counts = vec![0usize; n];
        let mut child_counts = vec![0usize; n];
        let mut page_counts = vec![0usize; n];
        let mut dangling = 0usize;
        for page in &all_pages {
            let member = index.get(&page.id).copied();
            for parent in self.parent_indices(language, page.id, &index, &mut dangling)? {
                match member {
                    Some(child) if child == parent => {}
                    Some(child) => {
                        child_counts[parent as usize] += 1;
                        parent_counts[child as usize] += 1;
                    }
                    None => page_counts[parent as usize] += 1,
                }
            }
        }
        debug!(dangling, "skipped memberships pointing outside the category namespace");

        // Fill pass.
        let mut parents = Slots::<u32>::with_counts(&parent_counts);
        let mut children = Slots::<u32>::with_counts(&child_counts);
        let mut pages = Slots::<PageId>::with_counts(&page_counts);
        let mut ignored = 0usize;
        for page in &all_pages {
            let member = index.get(&page.id).copied();
            for parent in self.parent_indices(language, page.id, &index, &mut ignored)? {
                match member {
                    Some(child) if child == parent => {}
                    Some(child) => {
                        children.fill(parent, child, "child")?;
                        parents.fill(child, parent, "parent")?;
                    }
                    None => pages.fill(parent, page.id, "page")?,
                }
            }
        }
        let parents = parents.finish("parent")?;
        let children = children.finish("child")?;
        let pages = pages.finish("page")?;

        let wanted: FxHashSet<String> = self
            .config
            .top_level_categories
            .iter()
            .map(|t| normalize_category_title(t))
            .collect();
        let top_level: Vec<bool> = titles.iter().map(|t| wanted.contains(t)).collect();

        let propagation = RankPropagation::from_config(&self.config);
        let out_links = match propagation.direction() {
            PropagationDirection::Parents => &parents,
            PropagationDirection::Children => &children,
        };
        let result = propagation.run(seed_ranks(&page_counts), out_links);
        debug!(
            rounds = result.iterations,
            final_error = result.final_error(),
            converged = result.converged,
            "rank propagation finished"
        );
        let costs = ranks_to_costs(&result.ranks);

        let graph = CategoryGraph::from_parts(GraphParts {
            language: language.to_string(),
            category_ids,
            titles,
            costs,
            parents,
            children,
            pages,
            top_level,
            propagation_rounds: result.iterations,
        })?;

        let stats = graph.stats();
        info!(
            language,
            categories = stats.num_categories,
            parent_links = stats.num_parent_links,
            page_links = stats.num_page_links,
            top_level = stats.num_top_level,
            min_cost = stats.min_cost,
            "built category graph"
        );
        Ok(graph)
    }

    /// Dense indices of the distinct parent categories of `page`
    fn parent_indices(
        &self,
        language: &str,
        page: PageId,
        index: &FxHashMap<PageId, u32>,
        dangling: &mut usize,
    ) -> Result<Vec<u32>> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for category in self.store.categories_of(language, page)? {
            if !seen.insert(category) {
                continue;
            }
            match index.get(&category) {
                Some(&dense) => out.push(dense),
                None => *dangling += 1,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::source::MemoryCategoryStore;
    use crate::types::Page;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chain_store() -> MemoryCategoryStore {
        // A is parent of B, B is parent of C, page 10 is filed under C.
        let mut store = MemoryCategoryStore::new();
        store.add_category("en", 1, "Category:A");
        store.add_category("en", 2, "Category:B");
        store.add_category("en", 3, "Category:C");
        store.add_article("en", 10, "Page");
        store.file_under("en", 2, 1);
        store.file_under("en", 3, 2);
        store.file_under("en", 10, 3);
        store
    }

    #[test]
    fn test_build_chain() {
        let store = chain_store();
        let graph = CategoryGraphBuilder::new(&store).build("en").unwrap();

        assert_eq!(graph.num_categories(), 3);
        let a = graph.dense_index(1).unwrap();
        let b = graph.dense_index(2).unwrap();
        let c = graph.dense_index(3).unwrap();
        assert_eq!(graph.children(a), &[b]);
        assert_eq!(graph.parents(b), &[a]);
        assert_eq!(graph.parents(c), &[b]);
        assert_eq!(graph.pages(c), &[10]);
        assert!(graph.pages(a).is_empty());
        assert!(graph.min_cost() < 1.0);
    }

    #[test]
    fn test_top_level_marked() {
        let mut store = chain_store();
        store.add_category("en", 4, "Category:Science");
        store.file_under("en", 1, 4);
        let graph = CategoryGraphBuilder::new(&store).build("en").unwrap();
        let science = graph.dense_index(4).unwrap();
        assert!(graph.is_top_level(science));
        assert_eq!(graph.top_level_categories(), vec![science]);
    }

    #[test]
    fn test_duplicate_and_dangling_memberships() {
        let mut store = chain_store();
        store.add_article("en", 11, "Other");
        store.file_under("en", 11, 3);
        store.file_under("en", 11, 999);
        store.file_under("en", 3, 3);
        let graph = CategoryGraphBuilder::new(&store).build("en").unwrap();
        let c = graph.dense_index(3).unwrap();
        let mut members = graph.pages(c).to_vec();
        members.sort_unstable();
        assert_eq!(members, vec![10, 11]);
        assert!(graph.children(c).is_empty());
    }

    #[test]
    fn test_empty_category_namespace() {
        let mut store = MemoryCategoryStore::new();
        store.add_article("en", 1, "Lonely");
        let err = CategoryGraphBuilder::new(&store).build("en").unwrap_err();
        assert!(err.is_build_fatal());
    }

    /// Answers with one more membership on every call after the first pass
    struct DriftingStore {
        inner: MemoryCategoryStore,
        calls: AtomicUsize,
    }

    impl CategoryStore for DriftingStore {
        fn pages(&self, language: &str, namespace: Option<Namespace>) -> Result<Vec<Page>> {
            self.inner.pages(language, namespace)
        }

        fn categories_of(&self, language: &str, page: PageId) -> Result<Vec<PageId>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut cats = self.inner.categories_of(language, page)?;
            if page == 10 && call >= 4 {
                cats.push(2);
            }
            Ok(cats)
        }
    }

    #[test]
    fn test_inconsistent_store_is_fatal() {
        let store = DriftingStore {
            inner: chain_store(),
            calls: AtomicUsize::new(0),
        };
        let err = CategoryGraphBuilder::new(&store).build("en").unwrap_err();
        assert!(matches!(err, RelatednessError::GraphInvariant { .. }));
    }
}
