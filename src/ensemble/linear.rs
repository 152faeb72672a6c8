//! Trained linear ensemble
//!
//! Pairwise model: `known ≈ w0 + Σ wi * score_i`.
//!
//! Most-similar model: `known ≈ w0 + Σ (si * score_i + ri * ln(rank_i + 1))`,
//! where ranks are zero-based list positions. At query time the rank term is
//! rescaled by `training_pool_size / query_pool_size`, so a rank drawn from a
//! small valid-id pool is comparable to one drawn from the training pool.
//!
//! Missing scores and ranks are replaced by the learned [`Interpolator`]
//! values, both during training and at query time.

use super::interpolator::Interpolator;
use super::persist::{
    self, MOST_SIMILAR_COEFFICIENTS, MOST_SIMILAR_INTERPOLATOR, SIMILARITY_COEFFICIENTS,
    SIMILARITY_INTERPOLATOR,
};
use super::regression::fit_least_squares;
use super::{Ensemble, EnsembleSim};
use crate::errors::{RelatednessError, Result};
use crate::leaderboard::Leaderboard;
use crate::types::{EnsembleKind, PageId, RankedResultList};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const KIND: &str = "linear";

/// Fitted pairwise coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityModel {
    pub intercept: f64,
    /// One weight per sub-metric
    pub weights: Vec<f64>,
}

impl SimilarityModel {
    fn predict(&self, scores: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(scores)
                .map(|(w, s)| w * s)
                .sum::<f64>()
    }
}

/// Fitted most-similar coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostSimilarModel {
    pub intercept: f64,
    /// Weight on each sub-metric's score
    pub score_weights: Vec<f64>,
    /// Weight on each sub-metric's `ln(rank + 1)`
    pub rank_weights: Vec<f64>,
    /// Size of the candidate pool the training lists came from
    pub training_pool_size: usize,
}

/// Linear-regression ensemble with interpolation of missing inputs
#[derive(Debug, Default, Clone)]
pub struct LinearEnsemble {
    similarity: Option<(SimilarityModel, Interpolator)>,
    most_similar: Option<(MostSimilarModel, Interpolator)>,
}

impl LinearEnsemble {
    /// Create an untrained ensemble
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a pairwise model directly
    pub fn with_similarity_model(mut self, model: SimilarityModel, interpolator: Interpolator) -> Result<Self> {
        if model.weights.len() != interpolator.num_metrics() {
            return Err(RelatednessError::dimension_mismatch(
                interpolator.num_metrics(),
                model.weights.len(),
            ));
        }
        self.similarity = Some((model, interpolator));
        Ok(self)
    }

    /// Install a most-similar model directly
    pub fn with_most_similar_model(
        mut self,
        model: MostSimilarModel,
        interpolator: Interpolator,
    ) -> Result<Self> {
        let n = interpolator.num_metrics();
        if model.score_weights.len() != n || model.rank_weights.len() != n {
            return Err(RelatednessError::dimension_mismatch(n, model.score_weights.len()));
        }
        self.most_similar = Some((model, interpolator));
        Ok(self)
    }

    /// The trained pairwise model, if any
    pub fn similarity_model(&self) -> Option<&SimilarityModel> {
        self.similarity.as_ref().map(|(m, _)| m)
    }

    /// The trained most-similar model, if any
    pub fn most_similar_model(&self) -> Option<&MostSimilarModel> {
        self.most_similar.as_ref().map(|(m, _)| m)
    }
}

/// Drop examples without a usable gold value
fn usable(examples: &[EnsembleSim]) -> Result<Vec<EnsembleSim>> {
    let kept: Vec<EnsembleSim> = examples
        .iter()
        .filter(|e| e.known_sim().is_finite())
        .cloned()
        .collect();
    if kept.is_empty() {
        return Err(RelatednessError::no_training_data(format!(
            "none of {} examples has a finite known similarity",
            examples.len()
        )));
    }
    Ok(kept)
}

fn log_rank(rank: f64) -> f64 {
    (rank + 1.0).ln()
}

impl Ensemble for LinearEnsemble {
    fn kind(&self) -> EnsembleKind {
        EnsembleKind::Linear
    }

    fn train_similarity(&mut self, examples: &[EnsembleSim]) -> Result<()> {
        let examples = usable(examples)?;
        let interpolator = Interpolator::train(&examples)?;
        let n = interpolator.num_metrics();

        let features: Vec<Vec<f64>> = examples
            .iter()
            .map(|e| {
                (0..n)
                    .map(|i| interpolator.interpolate_score(i, e.scores()[i]))
                    .collect()
            })
            .collect();
        let targets: Vec<f64> = examples.iter().map(EnsembleSim::known_sim).collect();
        let fit = fit_least_squares(&features, &targets)?;
        info!(
            examples = examples.len(),
            metrics = n,
            r_squared = fit.r_squared,
            "trained pairwise linear ensemble"
        );

        let model = SimilarityModel {
            intercept: fit.coefficients[0],
            weights: fit.coefficients[1..].to_vec(),
        };
        self.similarity = Some((model, interpolator));
        Ok(())
    }

    fn train_most_similar(&mut self, examples: &[EnsembleSim], pool_size: usize) -> Result<()> {
        let examples = usable(examples)?;
        let interpolator = Interpolator::train(&examples)?;
        let n = interpolator.num_metrics();

        let features: Vec<Vec<f64>> = examples
            .iter()
            .map(|e| {
                let mut row = Vec::with_capacity(2 * n);
                for i in 0..n {
                    row.push(interpolator.interpolate_score(i, e.scores()[i]));
                    row.push(log_rank(interpolator.interpolate_rank(i, e.ranks()[i])));
                }
                row
            })
            .collect();
        let targets: Vec<f64> = examples.iter().map(EnsembleSim::known_sim).collect();
        let fit = fit_least_squares(&features, &targets)?;
        info!(
            examples = examples.len(),
            metrics = n,
            pool_size,
            r_squared = fit.r_squared,
            "trained most-similar linear ensemble"
        );

        let model = MostSimilarModel {
            intercept: fit.coefficients[0],
            score_weights: fit.coefficients.iter().skip(1).step_by(2).copied().collect(),
            rank_weights: fit.coefficients.iter().skip(2).step_by(2).copied().collect(),
            training_pool_size: pool_size,
        };
        self.most_similar = Some((model, interpolator));
        Ok(())
    }

    fn predict_similarity(&self, scores: &[f64]) -> Result<f64> {
        let Some((model, interpolator)) = &self.similarity else {
            return Err(RelatednessError::not_trained("linear similarity"));
        };
        if scores.len() != interpolator.num_metrics() {
            return Err(RelatednessError::dimension_mismatch(
                interpolator.num_metrics(),
                scores.len(),
            ));
        }
        let filled: Vec<f64> = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| interpolator.interpolate_score(i, s))
            .collect();
        Ok(model.predict(&filled))
    }

    fn predict_most_similar(
        &self,
        lists: &[Option<RankedResultList>],
        max_results: usize,
        query_pool: Option<usize>,
    ) -> Result<RankedResultList> {
        let Some((model, interpolator)) = &self.most_similar else {
            return Err(RelatednessError::not_trained("linear most-similar"));
        };
        let n = interpolator.num_metrics();
        if lists.len() != n {
            return Err(RelatednessError::dimension_mismatch(n, lists.len()));
        }

        let ratio = match query_pool {
            Some(pool) if pool > 0 && model.training_pool_size > 0 => {
                model.training_pool_size as f64 / pool as f64
            }
            _ => 1.0,
        };

        let positions: Vec<Option<FxHashMap<PageId, usize>>> = lists
            .iter()
            .map(|l| l.as_ref().map(RankedResultList::position_index))
            .collect();
        let candidates: FxHashSet<PageId> = lists
            .iter()
            .flatten()
            .flat_map(|l| l.iter().map(|r| r.id))
            .collect();

        // Absent candidates get the same fill-in contribution from a metric
        // regardless of id.
        let absent: Vec<f64> = (0..n)
            .map(|i| {
                model.score_weights[i] * interpolator.missing_score(i)
                    + model.rank_weights[i] * log_rank(interpolator.missing_rank(i))
            })
            .collect();

        let mut board = Leaderboard::new(max_results);
        for id in candidates {
            let mut total = model.intercept;
            for i in 0..n {
                let hit = match (&lists[i], &positions[i]) {
                    (Some(list), Some(index)) => index
                        .get(&id)
                        .and_then(|&pos| list.get(pos).map(|r| (pos, r.score))),
                    _ => None,
                };
                total += match hit {
                    Some((pos, score)) => {
                        model.score_weights[i] * interpolator.interpolate_score(i, score)
                            + model.rank_weights[i] * ((pos as f64 + 1.0) * ratio).ln()
                    }
                    None => absent[i],
                };
            }
            board.tally(id, total);
        }
        Ok(board.top())
    }

    fn write(&self, dir: &Path) -> Result<()> {
        if self.similarity.is_none() && self.most_similar.is_none() {
            return Err(RelatednessError::not_trained("linear ensemble"));
        }
        if let Some((model, interpolator)) = &self.similarity {
            persist::write_artifact(dir, SIMILARITY_COEFFICIENTS, KIND, model)?;
            persist::write_artifact(dir, SIMILARITY_INTERPOLATOR, KIND, interpolator)?;
        }
        if let Some((model, interpolator)) = &self.most_similar {
            persist::write_artifact(dir, MOST_SIMILAR_COEFFICIENTS, KIND, model)?;
            persist::write_artifact(dir, MOST_SIMILAR_INTERPOLATOR, KIND, interpolator)?;
        }
        Ok(())
    }

    fn read(&mut self, dir: &Path) -> Result<()> {
        let similarity = if persist::artifact_exists(dir, SIMILARITY_COEFFICIENTS) {
            Some((
                persist::read_artifact(dir, SIMILARITY_COEFFICIENTS, KIND)?,
                persist::read_artifact(dir, SIMILARITY_INTERPOLATOR, KIND)?,
            ))
        } else {
            None
        };
        let most_similar = if persist::artifact_exists(dir, MOST_SIMILAR_COEFFICIENTS) {
            Some((
                persist::read_artifact(dir, MOST_SIMILAR_COEFFICIENTS, KIND)?,
                persist::read_artifact(dir, MOST_SIMILAR_INTERPOLATOR, KIND)?,
            ))
        } else {
            None
        };
        if similarity.is_none() && most_similar.is_none() {
            return Err(RelatednessError::io(format!(
                "no linear ensemble artifacts in {}",
                dir.display()
            )));
        }
        self.similarity = similarity;
        self.most_similar = most_similar;
        Ok(())
    }
}
