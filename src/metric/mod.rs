//! Relatedness metrics
//!
//! Every metric implements [`RelatednessMetric`]: pairwise `similarity` and
//! top-K `most_similar`. Concrete strategies (category graph, cosine,
//! link overlap, ensembles of any of these) are interchangeable behind the
//! trait and can be looked up by name through a [`MetricRegistry`].

pub mod category;
pub mod cosine;
pub mod google;
pub mod matrix;

use crate::errors::{RelatednessError, Result};
use crate::types::{PageId, RankedResult, RankedResultList};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

pub use category::CategoryGraphSimilarity;
pub use cosine::CosineSimilarity;
pub use google::{google_similarity, GoogleSimilarity};
pub use matrix::{SparseMatrix, SparseVector};

/// The base-metric capability
///
/// # Contract
///
/// - `similarity(a, b)` returns a result whose `id` is `b`. A NaN score means
///   the metric has no opinion about the pair; it is not an error.
/// - `most_similar(page, k, valid_ids)` returns at most `k` results sorted
///   descending by score, never containing `page` itself, restricted to
///   `valid_ids` when given.
pub trait RelatednessMetric: Send + Sync {
    /// Registry name of this metric
    fn name(&self) -> &str;

    /// Relatedness of two pages
    fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult>;

    /// The `max_results` pages most related to `page`
    fn most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList>;

    /// Dense `rows x cols` score matrix, rows computed in parallel
    fn cosimilarity(&self, rows: &[PageId], cols: &[PageId]) -> Result<Vec<Vec<f64>>> {
        rows.par_iter()
            .map(|&row| {
                cols.iter()
                    .map(|&col| self.similarity(row, col).map(|r| r.score))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect()
    }
}

/// Name -> metric lookup table, built once at startup
#[derive(Default, Clone)]
pub struct MetricRegistry {
    metrics: FxHashMap<String, Arc<dyn RelatednessMetric>>,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}

impl MetricRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under its own name, returning any metric it replaced
    pub fn register(
        &mut self,
        metric: Arc<dyn RelatednessMetric>,
    ) -> Option<Arc<dyn RelatednessMetric>> {
        self.metrics.insert(metric.name().to_string(), metric)
    }

    /// Look up a metric by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn RelatednessMetric>> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| RelatednessError::unknown_metric(name))
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Resolve an ordered list of names, failing on the first unknown one
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn RelatednessMetric>>> {
        names.iter().map(|name| self.get(name.as_ref())).collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::leaderboard::Leaderboard;

    /// A metric answering from a fixed score table
    pub struct TableMetric {
        pub name: String,
        pub scores: FxHashMap<(PageId, PageId), f64>,
        pub fail: bool,
    }

    impl TableMetric {
        pub fn new(name: &str, entries: &[(PageId, PageId, f64)]) -> Self {
            let mut scores = FxHashMap::default();
            for &(a, b, s) in entries {
                scores.insert((a, b), s);
                scores.insert((b, a), s);
            }
            Self {
                name: name.to_string(),
                scores,
                fail: false,
            }
        }

        pub fn failing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                scores: FxHashMap::default(),
                fail: true,
            }
        }
    }

    impl RelatednessMetric for TableMetric {
        fn name(&self) -> &str {
            &self.name
        }

        fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
            if self.fail {
                return Err(RelatednessError::metric_failure(&self.name, "forced failure"));
            }
            let score = self.scores.get(&(a, b)).copied().unwrap_or(f64::NAN);
            Ok(RankedResult::new(b, score))
        }

        fn most_similar(
            &self,
            page: PageId,
            max_results: usize,
            valid_ids: Option<&FxHashSet<PageId>>,
        ) -> Result<RankedResultList> {
            if self.fail {
                return Err(RelatednessError::metric_failure(&self.name, "forced failure"));
            }
            let mut board = Leaderboard::new(max_results);
            for (&(a, b), &score) in &self.scores {
                if a == page && b != page && valid_ids.map_or(true, |v| v.contains(&b)) {
                    board.tally(b, score);
                }
            }
            Ok(board.top())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::TableMetric;
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let mut registry = MetricRegistry::new();
        assert!(registry
            .register(Arc::new(TableMetric::new("links", &[(1, 2, 0.5)])))
            .is_none());
        registry.register(Arc::new(TableMetric::new("text", &[])));

        assert_eq!(registry.names(), vec!["links".to_string(), "text".to_string()]);
        assert!(registry.contains("links"));
        let metric = registry.get("links").unwrap();
        assert_eq!(metric.similarity(1, 2).unwrap().score, 0.5);

        let err = registry.get("missing").err().unwrap();
        assert!(matches!(err, RelatednessError::UnknownMetric { .. }));
        assert!(registry.resolve(&["text", "links"]).is_ok());
        assert!(registry.resolve(&["text", "nope"]).is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = MetricRegistry::new();
        registry.register(Arc::new(TableMetric::new("links", &[])));
        let replaced = registry.register(Arc::new(TableMetric::new("links", &[(1, 2, 0.1)])));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_cosimilarity() {
        let metric = TableMetric::new("links", &[(1, 2, 0.5), (1, 3, 0.25)]);
        let matrix = metric.cosimilarity(&[1], &[2, 3]).unwrap();
        assert_eq!(matrix, vec![vec![0.5, 0.25]]);

        let failing = TableMetric::failing("broken");
        assert!(failing.cosimilarity(&[1], &[2]).is_err());
    }
}
