//! Ensembles of relatedness metrics
//!
//! An [`Ensemble`] fuses the outputs of several sub-metrics into one score
//! (pairwise) or one ranked list (most-similar). Two combiners exist:
//!
//! - [`EvenEnsemble`]: fixed equal weights, no training. Missing sub-metric
//!   output is skipped, never interpolated.
//! - [`LinearEnsemble`]: ordinary least squares over sub-metric scores (and
//!   log-ranks for most-similar), with an [`Interpolator`] standing in for
//!   sub-metrics that were silent.
//!
//! [`EnsembleMetric`] wraps either combiner as a [`RelatednessMetric`]
//! (see [`crate::metric`]), so ensembles can themselves be ensembled.
//!
//! [`RelatednessMetric`]: crate::metric::RelatednessMetric

pub mod even;
pub mod interpolator;
pub mod linear;
pub mod metric;
pub mod persist;
pub mod regression;

use crate::errors::Result;
use crate::types::{EnsembleKind, RankedResultList};
use std::path::Path;

pub use even::EvenEnsemble;
pub use interpolator::Interpolator;
pub use linear::{LinearEnsemble, MostSimilarModel, SimilarityModel};
pub use metric::EnsembleMetric;
pub use regression::{fit_least_squares, LeastSquaresFit};

/// Rank recorded when a sub-metric did not return the candidate
pub const MISSING_RANK: i32 = -1;

/// One training example: a gold-standard judgment plus, per sub-metric, the
/// raw score (non-finite when missing) and rank ([`MISSING_RANK`] when
/// missing)
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleSim {
    known_sim: f64,
    scores: Vec<f64>,
    ranks: Vec<i32>,
}

impl EnsembleSim {
    /// Start an example for a known similarity
    pub fn new(known_sim: f64) -> Self {
        Self {
            known_sim,
            scores: Vec::new(),
            ranks: Vec::new(),
        }
    }

    /// Build from complete score and rank vectors
    pub fn from_parts(known_sim: f64, scores: Vec<f64>, ranks: Vec<i32>) -> Self {
        debug_assert_eq!(scores.len(), ranks.len());
        Self {
            known_sim,
            scores,
            ranks,
        }
    }

    /// Append the next sub-metric's output
    pub fn add(&mut self, score: f64, rank: i32) {
        self.scores.push(score);
        self.ranks.push(rank);
    }

    /// Append a sub-metric that produced nothing
    pub fn add_missing(&mut self) {
        self.add(f64::NAN, MISSING_RANK);
    }

    /// Gold-standard similarity
    pub fn known_sim(&self) -> f64 {
        self.known_sim
    }

    /// Raw per-metric scores
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Raw per-metric ranks
    pub fn ranks(&self) -> &[i32] {
        &self.ranks
    }

    /// Number of sub-metrics recorded
    pub fn num_metrics(&self) -> usize {
        self.scores.len()
    }

    /// Whether sub-metric `i` produced a usable score
    pub fn has_score(&self, i: usize) -> bool {
        self.scores.get(i).is_some_and(|s| s.is_finite())
    }

    /// Whether sub-metric `i` ranked the candidate
    pub fn has_rank(&self, i: usize) -> bool {
        self.ranks.get(i).is_some_and(|&r| r >= 0)
    }
}

/// A combiner of sub-metric outputs
///
/// Training takes `&mut self`; serving takes `&self`. Retraining an instance
/// that is serving traffic therefore requires exclusive access (or building
/// a new instance and swapping it in).
pub trait Ensemble: Send + Sync {
    /// Which combiner this is
    fn kind(&self) -> EnsembleKind;

    /// Fit the pairwise model
    fn train_similarity(&mut self, examples: &[EnsembleSim]) -> Result<()>;

    /// Fit the most-similar model; `pool_size` is the size of the candidate
    /// universe the training lists were drawn from
    fn train_most_similar(&mut self, examples: &[EnsembleSim], pool_size: usize) -> Result<()>;

    /// Combine one score per sub-metric (non-finite = missing)
    fn predict_similarity(&self, scores: &[f64]) -> Result<f64>;

    /// Merge one candidate list per sub-metric (`None` = the sub-metric
    /// failed). `query_pool` is the size of the caller's valid-id set.
    fn predict_most_similar(
        &self,
        lists: &[Option<RankedResultList>],
        max_results: usize,
        query_pool: Option<usize>,
    ) -> Result<RankedResultList>;

    /// Persist trained state into `dir`
    fn write(&self, dir: &Path) -> Result<()>;

    /// Load trained state from `dir`
    fn read(&mut self, dir: &Path) -> Result<()>;
}

impl EnsembleKind {
    /// A fresh, untrained combiner of this kind
    pub fn build(&self) -> Box<dyn Ensemble> {
        match self {
            EnsembleKind::Even => Box::new(EvenEnsemble::new()),
            EnsembleKind::Linear => Box::new(LinearEnsemble::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensemble_sim_accessors() {
        let mut sim = EnsembleSim::new(0.8);
        sim.add(0.5, 3);
        sim.add_missing();
        sim.add(f64::INFINITY, MISSING_RANK);

        assert_eq!(sim.num_metrics(), 3);
        assert!(sim.has_score(0));
        assert!(!sim.has_score(1));
        assert!(!sim.has_score(2));
        assert!(sim.has_rank(0));
        assert!(!sim.has_rank(1));
        assert!(!sim.has_score(7));
        assert_eq!(sim.known_sim(), 0.8);
    }

    #[test]
    fn test_kind_builds_matching_combiner() {
        assert_eq!(EnsembleKind::Even.build().kind(), EnsembleKind::Even);
        assert_eq!(EnsembleKind::Linear.build().kind(), EnsembleKind::Linear);
    }
}
