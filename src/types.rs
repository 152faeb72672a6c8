//! Core types for rapid_relatedness
//!
//! This module defines the data structures shared by every metric: page
//! identities, ranked results, gold-standard pairs, and configuration.

use crate::errors::{RelatednessError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Pages
// ============================================================================

/// Local page id within one language edition
pub type PageId = u32;

/// Page namespaces the relatedness core cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Regular content pages
    Article,
    /// Category pages
    Category,
    /// Anything else (talk, user, template, ...)
    Other,
}

impl Namespace {
    /// Parse from the numeric namespace used by MediaWiki dumps
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Namespace::Article,
            14 => Namespace::Category,
            _ => Namespace::Other,
        }
    }

    /// The MediaWiki numeric namespace (`Other` maps to -1)
    pub fn code(&self) -> i32 {
        match self {
            Namespace::Article => 0,
            Namespace::Category => 14,
            Namespace::Other => -1,
        }
    }
}

/// A page as supplied by the page store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Local page id
    pub id: PageId,
    /// Language code ("en", "simple", ...)
    pub language: String,
    /// Namespace of the page
    pub namespace: Namespace,
    /// Title, with or without the `Category:` prefix for categories
    pub title: String,
}

impl Page {
    /// Create a new page
    pub fn new(
        id: PageId,
        language: impl Into<String>,
        namespace: Namespace,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            language: language.into(),
            namespace,
            title: title.into(),
        }
    }

    /// Check if this page is a category
    pub fn is_category(&self) -> bool {
        self.namespace == Namespace::Category
    }

    /// Title without the namespace prefix, with underscores as spaces
    pub fn bare_title(&self) -> String {
        normalize_category_title(&self.title)
    }
}

/// Strip a leading `Category:` and turn underscores into spaces
pub fn normalize_category_title(title: &str) -> String {
    let trimmed = title.trim();
    let bare = trimmed
        .strip_prefix("Category:")
        .or_else(|| trimmed.strip_prefix("category:"))
        .unwrap_or(trimmed);
    bare.replace('_', " ")
}

/// A human-judged relatedness of two pages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnownSim {
    pub page_a: PageId,
    pub page_b: PageId,
    /// Gold-standard similarity judgment
    pub similarity: f64,
}

impl KnownSim {
    /// Create a new gold-standard pair
    pub fn new(page_a: PageId, page_b: PageId, similarity: f64) -> Self {
        Self {
            page_a,
            page_b,
            similarity,
        }
    }
}

// ============================================================================
// Ranked results
// ============================================================================

/// A scored candidate, optionally explained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Candidate page id
    pub id: PageId,
    /// Relatedness score (NaN when the metric had nothing to say)
    pub score: f64,
    /// Optional human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl RankedResult {
    /// Create a result without explanation
    pub fn new(id: PageId, score: f64) -> Self {
        Self {
            id,
            score,
            explanation: None,
        }
    }

    /// Attach an explanation
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Check if the score is usable (finite)
    pub fn is_valid(&self) -> bool {
        self.score.is_finite()
    }
}

/// A bounded, order-significant list of ranked results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResultList {
    results: Vec<RankedResult>,
    max_size: usize,
}

impl RankedResultList {
    /// Create an empty list holding at most `max_size` results
    pub fn new(max_size: usize) -> Self {
        Self {
            results: Vec::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Create a list from already-ordered results, truncating to `max_size`
    pub fn from_results(mut results: Vec<RankedResult>, max_size: usize) -> Self {
        results.truncate(max_size);
        Self { results, max_size }
    }

    /// Append a result; returns false when the list is full
    pub fn push(&mut self, result: RankedResult) -> bool {
        if self.results.len() >= self.max_size {
            return false;
        }
        self.results.push(result);
        true
    }

    /// Maximum number of results
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result at position `index`
    pub fn get(&self, index: usize) -> Option<&RankedResult> {
        self.results.get(index)
    }

    /// Iterate over results in list order
    pub fn iter(&self) -> impl Iterator<Item = &RankedResult> {
        self.results.iter()
    }

    /// Candidate ids in list order
    pub fn ids(&self) -> Vec<PageId> {
        self.results.iter().map(|r| r.id).collect()
    }

    /// Position of `id` in the list
    pub fn index_of(&self, id: PageId) -> Option<usize> {
        self.results.iter().position(|r| r.id == id)
    }

    /// Score of `id`, if present
    pub fn score_of(&self, id: PageId) -> Option<f64> {
        self.results.iter().find(|r| r.id == id).map(|r| r.score)
    }

    /// Id -> position lookup table, for repeated membership tests
    pub fn position_index(&self) -> FxHashMap<PageId, usize> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect()
    }

    /// Sort descending by score; NaN scores sink to the end, ties by id
    pub fn sort_descending(&mut self) {
        self.results.sort_by(|a, b| {
            let ka = if a.score.is_nan() { f64::NEG_INFINITY } else { a.score };
            let kb = if b.score.is_nan() { f64::NEG_INFINITY } else { b.score };
            kb.total_cmp(&ka).then_with(|| a.id.cmp(&b.id))
        });
    }

    /// Keep only the first `n` results
    pub fn truncate(&mut self, n: usize) {
        self.results.truncate(n);
    }

    /// Consume into the underlying vector
    pub fn into_vec(self) -> Vec<RankedResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a RankedResultList {
    type Item = &'a RankedResult;
    type IntoIter = std::slice::Iter<'a, RankedResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Curated top-level subject categories
pub const DEFAULT_TOP_LEVEL_CATEGORIES: &[&str] = &[
    "Agriculture",
    "Arts",
    "Belief",
    "Business",
    "Chronology",
    "Culture",
    "Education",
    "Environment",
    "Geography",
    "Health",
    "History",
    "Humanities",
    "Language",
    "Law",
    "Life",
    "Mathematics",
    "Nature",
    "People",
    "Politics",
    "Science",
    "Society",
    "Technology",
];

/// Adjacency direction along which rank credit is pushed during cost
/// propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationDirection {
    /// Each category hands credit to its parents
    #[default]
    Parents,
    /// Each category hands credit to its children
    Children,
}

/// Configuration for building a category graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryGraphConfig {
    /// Damping factor for rank propagation (typically 0.85)
    pub damping: f64,
    /// Maximum power-iteration rounds
    pub max_iterations: usize,
    /// Which adjacency list distributes credit
    pub direction: PropagationDirection,
    /// Titles of the top-level subject categories
    pub top_level_categories: Vec<String>,
}

impl Default for CategoryGraphConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 20,
            direction: PropagationDirection::Parents,
            top_level_categories: DEFAULT_TOP_LEVEL_CATEGORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl CategoryGraphConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.damping) {
            return Err(RelatednessError::invalid_config(format!(
                "damping must be in [0, 1), got {}",
                self.damping
            )));
        }
        if self.max_iterations == 0 {
            return Err(RelatednessError::invalid_config("max_iterations must be > 0"));
        }
        Ok(())
    }

    /// Builder method: set damping factor
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Builder method: set max iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder method: set propagation direction
    pub fn with_direction(mut self, direction: PropagationDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Builder method: replace the top-level category list
    pub fn with_top_level_categories<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.top_level_categories = titles.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration for category distance searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard cap on the number of category hops from a start category
    pub max_depth: usize,
    /// Cap on upward (child -> parent) hops; `None` means unlimited
    pub max_parent_depth: Option<usize>,
    /// Whether single-source searches enumerate member pages
    pub add_pages: bool,
    /// Memoize similarity / most-similar results
    pub cache_results: bool,
    /// Attach the meeting category to similarity results
    pub explain: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_parent_depth: None,
            add_pages: true,
            cache_results: true,
            explain: false,
        }
    }
}

impl SearchConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(RelatednessError::invalid_config("max_depth must be > 0"));
        }
        Ok(())
    }

    /// Builder method: set max depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder method: limit upward hops
    pub fn with_max_parent_depth(mut self, max_parent_depth: Option<usize>) -> Self {
        self.max_parent_depth = max_parent_depth;
        self
    }

    /// Builder method: enumerate member pages or not
    pub fn with_add_pages(mut self, add_pages: bool) -> Self {
        self.add_pages = add_pages;
        self
    }

    /// Builder method: enable/disable result caching
    pub fn with_cache_results(mut self, cache_results: bool) -> Self {
        self.cache_results = cache_results;
        self
    }

    /// Builder method: attach explanations
    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }
}

/// Which combiner an ensemble uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleKind {
    /// Fixed equal weights, no training
    Even,
    /// Trained linear model with interpolation
    #[default]
    Linear,
}

/// Configuration for an ensemble metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Combiner kind
    pub kind: EnsembleKind,
    /// Names of the sub-metrics, resolved through a `MetricRegistry`
    pub metrics: Vec<String>,
    /// Sub-metrics are asked for `k * candidate_multiplier` candidates
    pub candidate_multiplier: usize,
    /// Candidate list length requested from sub-metrics during training
    pub training_k: usize,
    /// Size of the candidate universe when no valid-id filter is given
    pub corpus_size: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            kind: EnsembleKind::Linear,
            metrics: Vec::new(),
            candidate_multiplier: 3,
            training_k: 500,
            corpus_size: 0,
        }
    }
}

impl EnsembleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.candidate_multiplier == 0 {
            return Err(RelatednessError::invalid_config(
                "candidate_multiplier must be > 0",
            ));
        }
        if self.training_k == 0 {
            return Err(RelatednessError::invalid_config("training_k must be > 0"));
        }
        Ok(())
    }

    /// Builder method: set combiner kind
    pub fn with_kind(mut self, kind: EnsembleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder method: set sub-metric names
    pub fn with_metrics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: set candidate multiplier
    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier;
        self
    }

    /// Builder method: set training list length
    pub fn with_training_k(mut self, training_k: usize) -> Self {
        self.training_k = training_k;
        self
    }

    /// Builder method: set corpus size
    pub fn with_corpus_size(mut self, corpus_size: usize) -> Self {
        self.corpus_size = corpus_size;
        self
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatednessConfig {
    #[serde(default)]
    pub category_graph: CategoryGraphConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

impl RelatednessConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.category_graph.validate()?;
        self.search.validate()?;
        self.ensemble.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_codes() {
        assert_eq!(Namespace::from_code(14), Namespace::Category);
        assert_eq!(Namespace::from_code(0), Namespace::Article);
        assert_eq!(Namespace::from_code(4), Namespace::Other);
        assert_eq!(Namespace::Category.code(), 14);
    }

    #[test]
    fn test_normalize_category_title() {
        assert_eq!(normalize_category_title("Category:Natural_sciences"), "Natural sciences");
        assert_eq!(normalize_category_title("Science"), "Science");
        let page = Page::new(3, "en", Namespace::Category, "Category:People");
        assert_eq!(page.bare_title(), "People");
        assert!(page.is_category());
    }

    #[test]
    fn test_ranked_list_bounded() {
        let mut list = RankedResultList::new(2);
        assert!(list.push(RankedResult::new(1, 0.5)));
        assert!(list.push(RankedResult::new(2, 0.9)));
        assert!(!list.push(RankedResult::new(3, 0.1)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.index_of(2), Some(1));
        assert_eq!(list.score_of(1), Some(0.5));
        assert_eq!(list.score_of(3), None);
    }

    #[test]
    fn test_ranked_list_sort() {
        let mut list = RankedResultList::from_results(
            vec![
                RankedResult::new(1, 0.2),
                RankedResult::new(2, f64::NAN),
                RankedResult::new(3, 0.7),
                RankedResult::new(4, 0.7),
            ],
            10,
        );
        list.sort_descending();
        assert_eq!(list.ids(), vec![3, 4, 1, 2]);
        let index = list.position_index();
        assert_eq!(index[&1], 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(CategoryGraphConfig::default().validate().is_ok());
        assert!(CategoryGraphConfig::default().with_damping(1.0).validate().is_err());
        assert!(CategoryGraphConfig::default()
            .with_max_iterations(0)
            .validate()
            .is_err());
        assert!(SearchConfig::default().with_max_depth(0).validate().is_err());
        assert!(EnsembleConfig::default()
            .with_candidate_multiplier(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_json() {
        let json = r#"{
            "ensemble": { "kind": "even", "metrics": ["category", "cosine"],
                          "candidate_multiplier": 2, "training_k": 50, "corpus_size": 1000 }
        }"#;
        let config = RelatednessConfig::from_json(json).unwrap();
        assert_eq!(config.ensemble.kind, EnsembleKind::Even);
        assert_eq!(config.ensemble.metrics, vec!["category", "cosine"]);
        assert_eq!(config.category_graph.max_iterations, 20);

        let back = RelatednessConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_json_rejects_invalid() {
        let json = r#"{ "search": { "max_depth": 0, "add_pages": true, "cache_results": false } }"#;
        assert!(RelatednessConfig::from_json(json).is_err());
    }
}
