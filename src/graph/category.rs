//! The immutable per-language category graph
//!
//! Categories are addressed by a dense `u32` index assigned in discovery
//! order. Adjacency, member pages and traversal costs are stored in
//! parallel vectors indexed by that dense id.

use crate::errors::{RelatednessError, Result};
use crate::types::PageId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Version tag written into cached graph blobs
pub const GRAPH_FORMAT_VERSION: u32 = 1;

/// Summary numbers for logging and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryGraphStats {
    pub num_categories: usize,
    pub num_parent_links: usize,
    pub num_page_links: usize,
    pub num_top_level: usize,
    pub propagation_rounds: usize,
    pub min_cost: f64,
}

/// Category graph with traversal costs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGraph {
    language: String,
    category_ids: Vec<PageId>,
    titles: Vec<String>,
    costs: Vec<f64>,
    parents: Vec<Vec<u32>>,
    children: Vec<Vec<u32>>,
    pages: Vec<Vec<PageId>>,
    top_level: Vec<bool>,
    min_cost: f64,
    propagation_rounds: usize,
    #[serde(skip)]
    index: FxHashMap<PageId, u32>,
}

#[derive(Serialize)]
struct GraphBlobRef<'a> {
    format_version: u32,
    graph: &'a CategoryGraph,
}

#[derive(Deserialize)]
struct GraphBlob {
    format_version: u32,
    graph: CategoryGraph,
}

/// Raw parts assembled by the builder
#[derive(Debug, Clone)]
pub(crate) struct GraphParts {
    pub language: String,
    pub category_ids: Vec<PageId>,
    pub titles: Vec<String>,
    pub costs: Vec<f64>,
    pub parents: Vec<Vec<u32>>,
    pub children: Vec<Vec<u32>>,
    pub pages: Vec<Vec<PageId>>,
    pub top_level: Vec<bool>,
    pub propagation_rounds: usize,
}

impl CategoryGraph {
    /// Assemble a graph and check every structural and cost invariant
    pub(crate) fn from_parts(parts: GraphParts) -> Result<Self> {
        let min_cost = super::cost::min_cost(&parts.costs);
        let mut graph = Self {
            language: parts.language,
            category_ids: parts.category_ids,
            titles: parts.titles,
            costs: parts.costs,
            parents: parts.parents,
            children: parts.children,
            pages: parts.pages,
            top_level: parts.top_level,
            min_cost,
            propagation_rounds: parts.propagation_rounds,
            index: FxHashMap::default(),
        };
        graph.rebuild_index();
        graph.validate()?;
        Ok(graph)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .category_ids
            .iter()
            .enumerate()
            .map(|(dense, &id)| (id, dense as u32))
            .collect();
    }

    /// Check structural consistency and the cost direction.
    ///
    /// Every parent link must be mirrored by exactly one child link, all
    /// indices must be in range, and all costs must be finite and positive
    /// with `min_cost < 1`.
    pub fn validate(&self) -> Result<()> {
        let n = self.category_ids.len();
        if n == 0 {
            return Err(RelatednessError::graph_invariant("graph has no categories"));
        }
        let lengths = [
            self.titles.len(),
            self.costs.len(),
            self.parents.len(),
            self.children.len(),
            self.pages.len(),
            self.top_level.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(RelatednessError::graph_invariant(format!(
                "per-category arrays disagree on length: {n} categories, lengths {lengths:?}"
            )));
        }
        if self.index.len() != n {
            return Err(RelatednessError::graph_invariant("duplicate category ids"));
        }

        let mut child_links = vec![0usize; n];
        for (dense, parents) in self.parents.iter().enumerate() {
            for &parent in parents {
                let parent = parent as usize;
                if parent >= n {
                    return Err(RelatednessError::graph_invariant(format!(
                        "category {dense} has out-of-range parent {parent}"
                    )));
                }
                child_links[parent] += 1;
            }
        }
        for (dense, children) in self.children.iter().enumerate() {
            if children.iter().any(|&c| c as usize >= n) {
                return Err(RelatednessError::graph_invariant(format!(
                    "category {dense} has an out-of-range child"
                )));
            }
            if children.len() != child_links[dense] {
                return Err(RelatednessError::graph_invariant(format!(
                    "category {dense} has {} children but {} parent links point to it",
                    children.len(),
                    child_links[dense]
                )));
            }
        }

        if self.costs.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(RelatednessError::cost_direction(self.min_cost));
        }
        if self.min_cost >= 1.0 || !self.min_cost.is_finite() {
            return Err(RelatednessError::cost_direction(self.min_cost));
        }
        Ok(())
    }

    /// Cache key for a language's graph
    pub fn cache_key(language: &str) -> String {
        format!("{language}-CategoryGraph")
    }

    /// Encode as a versioned JSON blob
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&GraphBlobRef {
            format_version: GRAPH_FORMAT_VERSION,
            graph: self,
        })?)
    }

    /// Decode a blob produced by [`to_blob`](Self::to_blob) and re-check
    /// all invariants
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let decoded: GraphBlob = serde_json::from_slice(blob)?;
        if decoded.format_version != GRAPH_FORMAT_VERSION {
            return Err(RelatednessError::serialization(format!(
                "unsupported category graph format {} (expected {GRAPH_FORMAT_VERSION})",
                decoded.format_version
            )));
        }
        let mut graph = decoded.graph;
        graph.rebuild_index();
        graph.validate()?;
        Ok(graph)
    }

    /// Language this graph was built for
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of categories
    pub fn num_categories(&self) -> usize {
        self.category_ids.len()
    }

    /// Dense index of a category page id
    pub fn dense_index(&self, category_id: PageId) -> Option<u32> {
        self.index.get(&category_id).copied()
    }

    /// Category page id of a dense index
    pub fn category_id(&self, dense: u32) -> PageId {
        self.category_ids[dense as usize]
    }

    /// Title of a category
    pub fn title(&self, dense: u32) -> &str {
        &self.titles[dense as usize]
    }

    /// Traversal cost of a category
    pub fn cost(&self, dense: u32) -> f64 {
        self.costs[dense as usize]
    }

    /// All traversal costs, by dense index
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Parent categories
    pub fn parents(&self, dense: u32) -> &[u32] {
        &self.parents[dense as usize]
    }

    /// Child categories
    pub fn children(&self, dense: u32) -> &[u32] {
        &self.children[dense as usize]
    }

    /// Pages filed directly in a category
    pub fn pages(&self, dense: u32) -> &[PageId] {
        &self.pages[dense as usize]
    }

    /// Whether a category is one of the curated top-level subjects
    pub fn is_top_level(&self, dense: u32) -> bool {
        self.top_level[dense as usize]
    }

    /// Dense indices of all top-level categories
    pub fn top_level_categories(&self) -> Vec<u32> {
        self.top_level
            .iter()
            .enumerate()
            .filter(|(_, &flag)| flag)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Smallest traversal cost in the graph
    pub fn min_cost(&self) -> f64 {
        self.min_cost
    }

    /// Convert a path cost to a similarity of at most 1.
    ///
    /// Distances are clamped to at least `min_cost`, so `min_cost` (and
    /// anything shorter) maps to 1. Paths longer than 1 score below zero and
    /// no path scores `-inf`.
    pub fn distance_to_score(&self, distance: f64) -> f64 {
        distance_to_score(distance, self.min_cost)
    }

    /// Summary numbers
    pub fn stats(&self) -> CategoryGraphStats {
        CategoryGraphStats {
            num_categories: self.num_categories(),
            num_parent_links: self.parents.iter().map(Vec::len).sum(),
            num_page_links: self.pages.iter().map(Vec::len).sum(),
            num_top_level: self.top_level.iter().filter(|&&t| t).count(),
            propagation_rounds: self.propagation_rounds,
            min_cost: self.min_cost,
        }
    }
}

/// `ln(d) / ln(min_cost)` with `d` clamped to `[min_cost, inf)`.
///
/// Strictly decreasing past `min_cost`; an unreachable pair gets the limit
/// of the formula, `-inf`, so it ranks below every connected pair.
pub fn distance_to_score(distance: f64, min_cost: f64) -> f64 {
    if distance.is_nan() || distance == f64::INFINITY {
        return f64::NEG_INFINITY;
    }
    let distance = distance.max(min_cost);
    distance.ln() / min_cost.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_parts() -> GraphParts {
        // 0 = Root, 1 = Leaf (child of Root)
        GraphParts {
            language: "en".to_string(),
            category_ids: vec![100, 101],
            titles: vec!["Root".to_string(), "Leaf".to_string()],
            costs: vec![0.6, 0.3],
            parents: vec![vec![], vec![0]],
            children: vec![vec![1], vec![]],
            pages: vec![vec![], vec![7]],
            top_level: vec![true, false],
            propagation_rounds: 3,
        }
    }

    #[test]
    fn test_from_parts_and_accessors() {
        let graph = CategoryGraph::from_parts(tiny_parts()).unwrap();
        assert_eq!(graph.num_categories(), 2);
        assert_eq!(graph.dense_index(101), Some(1));
        assert_eq!(graph.category_id(0), 100);
        assert_eq!(graph.pages(1), &[7]);
        assert_eq!(graph.top_level_categories(), vec![0]);
        assert!((graph.min_cost() - 0.3).abs() < 1e-15);
        let stats = graph.stats();
        assert_eq!(stats.num_parent_links, 1);
        assert_eq!(stats.num_page_links, 1);
    }

    #[test]
    fn test_rejects_unmirrored_links() {
        let mut parts = tiny_parts();
        parts.children = vec![vec![], vec![]];
        let err = CategoryGraph::from_parts(parts).unwrap_err();
        assert!(err.is_build_fatal());
    }

    #[test]
    fn test_rejects_inverted_costs() {
        let mut parts = tiny_parts();
        parts.costs = vec![1.5, 1.2];
        let err = CategoryGraph::from_parts(parts).unwrap_err();
        assert!(matches!(err, RelatednessError::CostDirection { .. }));
    }

    #[test]
    fn test_distance_to_score() {
        let min = 0.2;
        assert_eq!(distance_to_score(f64::INFINITY, min), f64::NEG_INFINITY);
        assert_eq!(distance_to_score(min, min), 1.0);
        assert_eq!(distance_to_score(0.0, min), 1.0);
        assert_eq!(distance_to_score(1.0, min), 0.0);
        let near = distance_to_score(0.3, min);
        let far = distance_to_score(0.6, min);
        assert!(near > far && far > 0.0);
    }

    #[test]
    fn test_distance_to_score_orders_long_paths() {
        let min = 0.285;
        let one_hop_past = distance_to_score(1.021, min);
        let two_hops_past = distance_to_score(1.447, min);
        let unreachable = distance_to_score(f64::INFINITY, min);
        assert!(one_hop_past < 0.0);
        assert!(one_hop_past > two_hops_past);
        assert!(two_hops_past > unreachable);
        let expected = 1.447f64.ln() / min.ln();
        assert!((two_hops_past - expected).abs() < 1e-15);
    }

    #[test]
    fn test_blob_roundtrip() {
        let graph = CategoryGraph::from_parts(tiny_parts()).unwrap();
        let blob = graph.to_blob().unwrap();
        let back = CategoryGraph::from_blob(&blob).unwrap();
        assert_eq!(back.costs(), graph.costs());
        assert_eq!(back.dense_index(100), Some(0));
        assert_eq!(back.language(), "en");
        assert_eq!(CategoryGraph::cache_key("en"), "en-CategoryGraph");
    }

    #[test]
    fn test_blob_rejects_garbage() {
        assert!(CategoryGraph::from_blob(b"not json").is_err());
    }
}
