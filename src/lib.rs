//! # rapid_relatedness
//!
//! Semantic relatedness between encyclopedia concepts.
//!
//! Pages are related when they sit close together in the category hierarchy,
//! share features, or are linked from the same places. This library builds a
//! weighted category graph per language, searches it for cheapest paths, and
//! fuses any number of relatedness metrics with trained ensembles.
//!
//! ## Features
//!
//! - **Category graph**: dense adjacency built in two passes, node costs from
//!   rank propagation over the hierarchy
//! - **Cost-ordered search**: single-source (most similar) and bidirectional
//!   (pairwise) expansion with hop and ascent limits
//! - **Pluggable metrics**: category distance, cosine over sparse vectors,
//!   link overlap, all behind one [`RelatednessMetric`] trait
//! - **Ensembles**: equal-weight and least-squares combiners that tolerate
//!   failing sub-metrics, with versioned on-disk models
//!
//! ## Example
//!
//! ```
//! use rapid_relatedness::{
//!     CategoryGraphBuilder, CategoryGraphSimilarity, MemoryCategoryStore, RelatednessMetric,
//!     SearchConfig,
//! };
//! use std::sync::Arc;
//!
//! let mut store = MemoryCategoryStore::new();
//! store.add_category("en", 1, "Physics");
//! store.add_article("en", 10, "Optics");
//! store.add_article("en", 11, "Laser");
//! store.file_under("en", 10, 1);
//! store.file_under("en", 11, 1);
//!
//! let graph = CategoryGraphBuilder::new(&store).build("en").unwrap();
//! let metric = CategoryGraphSimilarity::new(Arc::new(graph), Arc::new(store), SearchConfig::default());
//! let score = metric.similarity(10, 11).unwrap().score;
//! assert!(score > 0.0 && score <= 1.0);
//! ```

pub mod ensemble;
pub mod errors;
pub mod graph;
pub mod leaderboard;
pub mod metric;
pub mod search;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use errors::{RelatednessError, Result};
pub use types::{
    CategoryGraphConfig, EnsembleConfig, EnsembleKind, KnownSim, Namespace, Page, PageId,
    PropagationDirection, RankedResult, RankedResultList, RelatednessConfig, SearchConfig,
};

// Re-export main functionality
pub use ensemble::{Ensemble, EnsembleMetric, EnsembleSim, EvenEnsemble, LinearEnsemble};
pub use graph::{CategoryGraph, CategoryGraphBuilder, CategoryGraphRegistry, RankPropagation};
pub use leaderboard::Leaderboard;
pub use metric::{
    CategoryGraphSimilarity, CosineSimilarity, GoogleSimilarity, MetricRegistry,
    RelatednessMetric, SparseMatrix, SparseVector,
};
pub use search::{shortest_distance, CategoryBfs, PathDistance};
pub use source::{BlobCache, CategoryStore, MemoryBlobCache, MemoryCategoryStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
