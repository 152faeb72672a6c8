//! Bidirectional minimum-cost category distance
//!
//! Two [`CategoryBfs`] searches grow from the category sets of two pages.
//! Each round advances the side whose largest settled distance is smaller.
//! Whenever a settled category (or one of its neighbors) has been reached by
//! the other side, the joined path is a candidate. The search stops once the
//! two largest settled distances together are no smaller than the best
//! candidate: with non-negative costs no cheaper join can appear later.

use super::bfs::{CategoryBfs, Settled};
use crate::graph::CategoryGraph;
use crate::types::SearchConfig;
use tracing::trace;

/// Cheapest joined path between two category sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathDistance {
    /// Total path cost, infinity when the sets are not connected
    pub distance: f64,
    /// A category on the cheapest path where the two searches met
    pub meeting: Option<u32>,
    /// Categories settled by both searches together
    pub settled: usize,
}

impl PathDistance {
    fn unreachable() -> Self {
        Self {
            distance: f64::INFINITY,
            meeting: None,
            settled: 0,
        }
    }

    /// Whether any path was found
    pub fn is_connected(&self) -> bool {
        self.distance.is_finite()
    }

    fn consider(&mut self, distance: f64, meeting: u32) {
        if distance < self.distance {
            self.distance = distance;
            self.meeting = Some(meeting);
        }
    }
}

/// Minimum-cost path between `seeds_a` and `seeds_b`.
///
/// A category shared by both sides is counted once, so two pages filed in
/// the same category are exactly that category's cost apart.
pub fn shortest_distance(
    graph: &CategoryGraph,
    seeds_a: &[u32],
    seeds_b: &[u32],
    config: &SearchConfig,
) -> PathDistance {
    if seeds_a.is_empty() || seeds_b.is_empty() {
        return PathDistance::unreachable();
    }

    let config = config.clone().with_add_pages(false);
    let mut side_a = CategoryBfs::from_categories(graph, seeds_a, &config);
    let mut side_b = CategoryBfs::from_categories(graph, seeds_b, &config);
    let mut best = PathDistance::unreachable();

    while (side_a.has_more() || side_b.has_more())
        && side_a.max_distance() + side_b.max_distance() < best.distance
    {
        let advance_a = side_a.has_more()
            && (!side_b.has_more() || side_a.max_distance() <= side_b.max_distance());
        if advance_a {
            if let Some(settled) = side_a.step() {
                join(graph, &settled, &side_b, &mut best);
            }
        } else if let Some(settled) = side_b.step() {
            join(graph, &settled, &side_a, &mut best);
        }
    }

    best.settled = side_a.num_settled() + side_b.num_settled();
    trace!(
        distance = best.distance,
        settled = best.settled,
        "bidirectional category search finished"
    );
    best
}

fn join(graph: &CategoryGraph, settled: &Settled, other: &CategoryBfs<'_>, best: &mut PathDistance) {
    if let Some(other_distance) = other.distance_to(settled.category) {
        let total = settled.distance + other_distance - graph.cost(settled.category);
        best.consider(total, settled.category);
    }
    for &next in &settled.expanded {
        if let Some(other_distance) = other.distance_to(next) {
            best.consider(settled.distance + other_distance, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CategoryGraphBuilder;
    use crate::source::MemoryCategoryStore;

    /// Root(1) -> {Left(2), Right(3)}, Left -> Deep(4); Island(5) unconnected
    fn graph() -> CategoryGraph {
        let mut store = MemoryCategoryStore::new();
        for (id, title) in [(1, "Root"), (2, "Left"), (3, "Right"), (4, "Deep"), (5, "Island")] {
            store.add_category("en", id, title);
        }
        store.add_article("en", 10, "x");
        store.file_under("en", 2, 1);
        store.file_under("en", 3, 1);
        store.file_under("en", 4, 2);
        store.file_under("en", 10, 4);
        CategoryGraphBuilder::new(&store).build("en").unwrap()
    }

    fn idx(graph: &CategoryGraph, id: u32) -> u32 {
        graph.dense_index(id).unwrap()
    }

    #[test]
    fn test_same_category() {
        let g = graph();
        let left = idx(&g, 2);
        let result = shortest_distance(&g, &[left], &[left], &SearchConfig::default());
        assert_eq!(result.distance, g.cost(left));
        assert_eq!(result.meeting, Some(left));
    }

    #[test]
    fn test_siblings() {
        let g = graph();
        let (root, left, right) = (idx(&g, 1), idx(&g, 2), idx(&g, 3));
        let result = shortest_distance(&g, &[left], &[right], &SearchConfig::default());
        let expected = g.cost(left) + g.cost(root) + g.cost(right);
        assert!(result.is_connected());
        assert!((result.distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_prefers_cheaper_of_two_routes() {
        let g = graph();
        let (left, right, deep) = (idx(&g, 2), idx(&g, 3), idx(&g, 4));
        // From {Deep, Right} to Right: Right itself is shared.
        let result = shortest_distance(&g, &[deep, right], &[right], &SearchConfig::default());
        assert_eq!(result.distance, g.cost(right));
        let result = shortest_distance(&g, &[deep], &[left], &SearchConfig::default());
        assert!((result.distance - (g.cost(deep) + g.cost(left))).abs() < 1e-12);
    }

    #[test]
    fn test_unreachable() {
        let g = graph();
        let (left, island) = (idx(&g, 2), idx(&g, 5));
        let result = shortest_distance(&g, &[left], &[island], &SearchConfig::default());
        assert!(!result.is_connected());
        assert_eq!(result.meeting, None);
        assert!(!shortest_distance(&g, &[], &[left], &SearchConfig::default()).is_connected());
    }

    #[test]
    fn test_matches_single_source() {
        let g = graph();
        let (deep, right) = (idx(&g, 4), idx(&g, 3));
        let bidirectional = shortest_distance(&g, &[deep], &[right], &SearchConfig::default());

        let mut single = CategoryBfs::from_categories(&g, &[deep], &SearchConfig::default());
        single.run();
        let expected = single.settled_distance(right).unwrap();
        assert!((bidirectional.distance - expected).abs() < 1e-12);
    }
}
