//! Single-source cost-ordered category search
//!
//! [`CategoryBfs`] expands categories in order of accumulated cost, starting
//! from a set of seed categories. Entering a category adds that category's
//! own cost, so a seed starts at its cost and a page inherits the distance of
//! the category it was found in. Costs are non-negative, which makes the
//! settle order non-decreasing in distance.
//!
//! With a result limit, the search keeps going until every page tied with
//! the last admitted one has been recorded, so the caller can break ties by
//! id instead of by storage order.

use crate::graph::CategoryGraph;
use crate::types::{PageId, SearchConfig};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct Frontier {
    distance: f64,
    category: u32,
    depth: usize,
    ascents: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the cheapest entry; ties by category index.
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.category.cmp(&self.category))
    }
}

/// A category whose distance became final
#[derive(Debug, Clone)]
pub struct Settled {
    /// Dense category index
    pub category: u32,
    /// Final distance from the seeds
    pub distance: f64,
    /// Neighbors the search was allowed to move to from this category
    pub expanded: Vec<u32>,
}

/// Cost-ordered frontier expansion over a [`CategoryGraph`]
///
/// Top-level categories are settled (and their pages recorded) but never
/// expanded. The pairwise search in [`shortest_distance`] can still join two
/// sides at a top-level category, so a pair it connects may be unreachable
/// from either page alone.
///
/// [`shortest_distance`]: crate::search::shortest_distance
#[derive(Debug)]
pub struct CategoryBfs<'g> {
    graph: &'g CategoryGraph,
    max_depth: usize,
    max_parent_depth: Option<usize>,
    add_pages: bool,
    open: BinaryHeap<Frontier>,
    reached: FxHashMap<u32, f64>,
    settled: FxHashMap<u32, f64>,
    max_distance: f64,
    start_page: Option<PageId>,
    page_distances: FxHashMap<PageId, f64>,
    found: usize,
    max_results: usize,
    cutoff: Option<f64>,
    valid_ids: Option<&'g FxHashSet<PageId>>,
}

impl<'g> CategoryBfs<'g> {
    /// Search outward from a set of dense category indices
    pub fn from_categories(graph: &'g CategoryGraph, seeds: &[u32], config: &SearchConfig) -> Self {
        let mut bfs = Self {
            graph,
            max_depth: config.max_depth,
            max_parent_depth: config.max_parent_depth,
            add_pages: config.add_pages,
            open: BinaryHeap::with_capacity(seeds.len() * 4),
            reached: FxHashMap::default(),
            settled: FxHashMap::default(),
            max_distance: 0.0,
            start_page: None,
            page_distances: FxHashMap::default(),
            found: 0,
            max_results: usize::MAX,
            cutoff: None,
            valid_ids: None,
        };
        for &seed in seeds {
            bfs.relax(seed, graph.cost(seed), 0, 0);
        }
        bfs
    }

    /// Search outward from a page filed under `seeds`; the page itself is
    /// recorded at distance zero
    pub fn from_page(
        graph: &'g CategoryGraph,
        page: PageId,
        seeds: &[u32],
        config: &SearchConfig,
    ) -> Self {
        let mut bfs = Self::from_categories(graph, seeds, config);
        bfs.start_page = Some(page);
        bfs.page_distances.insert(page, 0.0);
        bfs
    }

    /// Stop once this many pages (other than the start page) were found,
    /// plus any further pages tied with the last of them
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        if max_results == 0 {
            self.cutoff = Some(f64::NEG_INFINITY);
        }
        self
    }

    /// Only record pages in this set
    pub fn with_valid_ids(mut self, valid_ids: Option<&'g FxHashSet<PageId>>) -> Self {
        self.valid_ids = valid_ids;
        self
    }

    /// Whether another [`step`](Self::step) may settle something
    pub fn has_more(&self) -> bool {
        match self.open.peek() {
            None => false,
            Some(next) => match self.cutoff {
                None => true,
                Some(cutoff) => next.distance <= cutoff,
            },
        }
    }

    /// Largest distance settled so far
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Best known distance to a category, settled or tentative
    pub fn distance_to(&self, category: u32) -> Option<f64> {
        self.reached.get(&category).copied()
    }

    /// Final distance to a category, if settled
    pub fn settled_distance(&self, category: u32) -> Option<f64> {
        self.settled.get(&category).copied()
    }

    /// Number of settled categories
    pub fn num_settled(&self) -> usize {
        self.settled.len()
    }

    /// Distances of pages found so far
    pub fn page_distances(&self) -> &FxHashMap<PageId, f64> {
        &self.page_distances
    }

    /// Consume the search, returning page distances
    pub fn into_page_distances(self) -> FxHashMap<PageId, f64> {
        self.page_distances
    }

    /// Settle the cheapest open category and expand it.
    ///
    /// Top-level categories are settled but never expanded.
    pub fn step(&mut self) -> Option<Settled> {
        let entry = loop {
            let entry = self.open.pop()?;
            if self.settled.contains_key(&entry.category) {
                continue;
            }
            if self.reached.get(&entry.category).copied() != Some(entry.distance) {
                continue;
            }
            break entry;
        };

        self.settled.insert(entry.category, entry.distance);
        self.max_distance = self.max_distance.max(entry.distance);

        if self.add_pages {
            self.record_pages(entry.category, entry.distance);
        }

        let mut expanded = Vec::new();
        if !self.graph.is_top_level(entry.category) && entry.depth < self.max_depth {
            let ascent_allowed = self
                .max_parent_depth
                .map_or(true, |limit| entry.ascents < limit);
            if ascent_allowed {
                for &parent in self.graph.parents(entry.category) {
                    expanded.push(parent);
                    let distance = entry.distance + self.graph.cost(parent);
                    self.relax(parent, distance, entry.depth + 1, entry.ascents + 1);
                }
            }
            for &child in self.graph.children(entry.category) {
                expanded.push(child);
                let distance = entry.distance + self.graph.cost(child);
                self.relax(child, distance, entry.depth + 1, entry.ascents);
            }
        }

        Some(Settled {
            category: entry.category,
            distance: entry.distance,
            expanded,
        })
    }

    /// Run until the frontier is exhausted or enough pages were found
    pub fn run(&mut self) {
        while self.has_more() {
            self.step();
        }
    }

    fn relax(&mut self, category: u32, distance: f64, depth: usize, ascents: usize) {
        if self.settled.contains_key(&category) {
            return;
        }
        let improved = self
            .reached
            .get(&category)
            .map_or(true, |&known| distance < known);
        if improved {
            self.reached.insert(category, distance);
            self.open.push(Frontier {
                distance,
                category,
                depth,
                ascents,
            });
        }
    }

    fn record_pages(&mut self, category: u32, distance: f64) {
        if self.cutoff.is_some_and(|cutoff| distance > cutoff) {
            return;
        }
        for &page in self.graph.pages(category) {
            if Some(page) == self.start_page || self.page_distances.contains_key(&page) {
                continue;
            }
            if let Some(valid) = self.valid_ids {
                if !valid.contains(&page) {
                    continue;
                }
            }
            self.page_distances.insert(page, distance);
            self.found += 1;
            if self.found == self.max_results {
                self.cutoff = Some(distance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CategoryGraphBuilder;
    use crate::source::MemoryCategoryStore;

    /// Root(1) with children Left(2) and Right(3); Left holds 10, 11 and
    /// Right holds 12.
    fn fork_graph() -> CategoryGraph {
        let mut store = MemoryCategoryStore::new();
        store.add_category("en", 1, "Category:Root");
        store.add_category("en", 2, "Category:Left");
        store.add_category("en", 3, "Category:Right");
        for (page, title) in [(10, "a"), (11, "b"), (12, "c")] {
            store.add_article("en", page, title);
        }
        store.file_under("en", 2, 1);
        store.file_under("en", 3, 1);
        store.file_under("en", 10, 2);
        store.file_under("en", 11, 2);
        store.file_under("en", 12, 3);
        CategoryGraphBuilder::new(&store).build("en").unwrap()
    }

    #[test]
    fn test_settles_in_distance_order() {
        let graph = fork_graph();
        let left = graph.dense_index(2).unwrap();
        let mut bfs = CategoryBfs::from_categories(&graph, &[left], &SearchConfig::default());
        let mut last = 0.0;
        while let Some(settled) = bfs.step() {
            assert!(settled.distance >= last);
            last = settled.distance;
        }
        assert_eq!(bfs.num_settled(), 3);
    }

    #[test]
    fn test_page_distances() {
        let graph = fork_graph();
        let left = graph.dense_index(2).unwrap();
        let right = graph.dense_index(3).unwrap();
        let root = graph.dense_index(1).unwrap();

        let mut bfs = CategoryBfs::from_page(&graph, 10, &[left], &SearchConfig::default());
        bfs.run();
        let distances = bfs.page_distances();
        assert_eq!(distances[&10], 0.0);
        assert_eq!(distances[&11], graph.cost(left));
        let expected = graph.cost(left) + graph.cost(root) + graph.cost(right);
        assert!((distances[&12] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_max_results_and_valid_ids() {
        let graph = fork_graph();
        let left = graph.dense_index(2).unwrap();

        let mut bfs = CategoryBfs::from_page(&graph, 10, &[left], &SearchConfig::default())
            .with_max_results(1);
        bfs.run();
        // 11 is the only page tied at the cut-off, so nothing else is added
        assert_eq!(bfs.page_distances().len(), 2);
        assert!(!bfs.has_more());

        let valid: FxHashSet<PageId> = [12].into_iter().collect();
        let mut bfs = CategoryBfs::from_page(&graph, 10, &[left], &SearchConfig::default())
            .with_valid_ids(Some(&valid));
        bfs.run();
        assert!(bfs.page_distances().contains_key(&12));
        assert!(!bfs.page_distances().contains_key(&11));
    }

    #[test]
    fn test_max_results_keeps_ties() {
        let mut store = MemoryCategoryStore::new();
        store.add_category("en", 1, "Category:Root");
        store.add_category("en", 2, "Category:Shared");
        store.file_under("en", 2, 1);
        for page in [10, 11, 20, 21] {
            store.add_article("en", page, "p");
        }
        for page in [10, 20, 11] {
            store.file_under("en", page, 2);
        }
        store.file_under("en", 21, 1);
        let graph = CategoryGraphBuilder::new(&store).build("en").unwrap();
        let shared = graph.dense_index(2).unwrap();

        let mut bfs = CategoryBfs::from_page(&graph, 10, &[shared], &SearchConfig::default())
            .with_max_results(1);
        bfs.run();
        let distances = bfs.page_distances();
        assert!(distances.contains_key(&11));
        assert!(distances.contains_key(&20));
        assert!(!distances.contains_key(&21));
        assert_eq!(distances[&11], distances[&20]);
    }

    #[test]
    fn test_parent_depth_limit() {
        let graph = fork_graph();
        let left = graph.dense_index(2).unwrap();
        let config = SearchConfig::default().with_max_parent_depth(Some(0));
        let mut bfs = CategoryBfs::from_page(&graph, 10, &[left], &config);
        bfs.run();
        assert!(!bfs.page_distances().contains_key(&12));
    }

    #[test]
    fn test_without_pages() {
        let graph = fork_graph();
        let left = graph.dense_index(2).unwrap();
        let config = SearchConfig::default().with_add_pages(false);
        let mut bfs = CategoryBfs::from_categories(&graph, &[left], &config);
        bfs.run();
        assert!(bfs.page_distances().is_empty());
        assert_eq!(bfs.num_settled(), 3);
    }
}
