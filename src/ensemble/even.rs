//! Equal-weight ensemble

use super::{persist, Ensemble, EnsembleSim};
use crate::errors::{RelatednessError, Result};
use crate::leaderboard::Leaderboard;
use crate::types::{EnsembleKind, PageId, RankedResultList};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

const KIND: &str = "even";
const MARKER: &str = "even.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct EvenState {
    num_metrics: Option<usize>,
}

/// Averages whatever the sub-metrics returned
///
/// Pairwise: mean of the finite scores (NaN when there are none).
/// Most-similar: each candidate collects `score / n` from every sub-metric
/// that returned it, where `n` is the number of sub-metrics; absent
/// candidates contribute nothing.
#[derive(Debug, Default, Clone)]
pub struct EvenEnsemble {
    num_metrics: Option<usize>,
}

impl EvenEnsemble {
    /// Create an even ensemble
    pub fn new() -> Self {
        Self::default()
    }

    fn observe(&mut self, examples: &[EnsembleSim]) -> Result<()> {
        let Some(first) = examples.first() else {
            return Err(RelatednessError::no_training_data(
                "even ensemble received no examples",
            ));
        };
        self.num_metrics = Some(first.num_metrics());
        Ok(())
    }

    fn check_width(&self, actual: usize) -> Result<()> {
        match self.num_metrics {
            Some(expected) if expected != actual => {
                Err(RelatednessError::dimension_mismatch(expected, actual))
            }
            _ => Ok(()),
        }
    }
}

impl Ensemble for EvenEnsemble {
    fn kind(&self) -> EnsembleKind {
        EnsembleKind::Even
    }

    fn train_similarity(&mut self, examples: &[EnsembleSim]) -> Result<()> {
        self.observe(examples)
    }

    fn train_most_similar(&mut self, examples: &[EnsembleSim], _pool_size: usize) -> Result<()> {
        self.observe(examples)
    }

    fn predict_similarity(&self, scores: &[f64]) -> Result<f64> {
        self.check_width(scores.len())?;
        let (sum, count) = scores
            .iter()
            .filter(|s| s.is_finite())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        Ok(if count == 0 { f64::NAN } else { sum / count as f64 })
    }

    fn predict_most_similar(
        &self,
        lists: &[Option<RankedResultList>],
        max_results: usize,
        _query_pool: Option<usize>,
    ) -> Result<RankedResultList> {
        self.check_width(lists.len())?;
        let n = lists.len() as f64;
        let mut totals: FxHashMap<PageId, f64> = FxHashMap::default();
        for list in lists.iter().flatten() {
            for result in list.iter().filter(|r| r.score.is_finite()) {
                *totals.entry(result.id).or_insert(0.0) += result.score / n;
            }
        }
        let mut board = Leaderboard::new(max_results);
        for (id, total) in totals {
            board.tally(id, total);
        }
        Ok(board.top())
    }

    fn write(&self, dir: &Path) -> Result<()> {
        let state = EvenState {
            num_metrics: self.num_metrics,
        };
        persist::write_artifact(dir, MARKER, KIND, &state)
    }

    fn read(&mut self, dir: &Path) -> Result<()> {
        let state: EvenState = persist::read_artifact(dir, MARKER, KIND)?;
        self.num_metrics = state.num_metrics;
        Ok(())
    }
}
