//! Stand-in values for sub-metrics that produced nothing
//!
//! Learned from the training examples:
//!
//! - missing score for metric `i`: mean gold similarity of the examples
//!   where metric `i` was missing (the mean of all examples if it never was)
//! - missing rank for metric `i`: [`MISSING_RANK_INFLATION`] times the
//!   largest rank metric `i` ever produced, so an absent candidate always
//!   looks worse than the worst present one

use super::EnsembleSim;
use crate::errors::{RelatednessError, Result};
use serde::{Deserialize, Serialize};

/// Factor applied to the largest observed rank
pub const MISSING_RANK_INFLATION: f64 = 1.25;

/// Per-metric fill-in values for missing scores and ranks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolator {
    missing_scores: Vec<f64>,
    missing_ranks: Vec<f64>,
}

impl Interpolator {
    /// Build from explicit per-metric values
    pub fn from_parts(missing_scores: Vec<f64>, missing_ranks: Vec<f64>) -> Result<Self> {
        if missing_scores.len() != missing_ranks.len() {
            return Err(RelatednessError::dimension_mismatch(
                missing_scores.len(),
                missing_ranks.len(),
            ));
        }
        Ok(Self {
            missing_scores,
            missing_ranks,
        })
    }

    /// Learn fill-in values from training examples
    pub fn train(examples: &[EnsembleSim]) -> Result<Self> {
        let Some(first) = examples.first() else {
            return Err(RelatednessError::no_training_data(
                "interpolator needs at least one example",
            ));
        };
        let n = first.num_metrics();
        if let Some(bad) = examples.iter().find(|e| e.num_metrics() != n) {
            return Err(RelatednessError::dimension_mismatch(n, bad.num_metrics()));
        }

        let overall_mean = mean(examples.iter().map(EnsembleSim::known_sim)).unwrap_or(0.0);
        let global_max_rank = examples
            .iter()
            .flat_map(|e| e.ranks().iter().copied())
            .filter(|&r| r >= 0)
            .max();

        let mut missing_scores = Vec::with_capacity(n);
        let mut missing_ranks = Vec::with_capacity(n);
        for i in 0..n {
            let missing_mean = mean(
                examples
                    .iter()
                    .filter(|e| !e.has_score(i))
                    .map(EnsembleSim::known_sim),
            );
            missing_scores.push(missing_mean.unwrap_or(overall_mean));

            let max_rank = examples
                .iter()
                .filter(|e| e.has_rank(i))
                .map(|e| e.ranks()[i])
                .max()
                .or(global_max_rank)
                .unwrap_or(examples.len() as i32);
            missing_ranks.push(f64::from(max_rank.max(1)) * MISSING_RANK_INFLATION);
        }

        Ok(Self {
            missing_scores,
            missing_ranks,
        })
    }

    /// Number of sub-metrics this interpolator covers
    pub fn num_metrics(&self) -> usize {
        self.missing_scores.len()
    }

    /// Fill-in score for metric `i`
    pub fn missing_score(&self, i: usize) -> f64 {
        self.missing_scores[i]
    }

    /// Fill-in rank for metric `i`
    pub fn missing_rank(&self, i: usize) -> f64 {
        self.missing_ranks[i]
    }

    /// `score` if finite, otherwise the fill-in for metric `i`
    pub fn interpolate_score(&self, i: usize, score: f64) -> f64 {
        if score.is_finite() {
            score
        } else {
            self.missing_scores[i]
        }
    }

    /// `rank` if present, otherwise the fill-in for metric `i`
    pub fn interpolate_rank(&self, i: usize, rank: i32) -> f64 {
        if rank >= 0 {
            f64::from(rank)
        } else {
            self.missing_ranks[i]
        }
    }
}

/// Arithmetic mean of finite values, `None` when there are none
fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
