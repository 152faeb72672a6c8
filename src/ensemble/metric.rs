//! An ensemble exposed as a relatedness metric
//!
//! Sub-metric failures are absorbed: a failing sub-metric contributes a
//! missing score (pairwise) or no list (most-similar) and a warning is
//! logged. Only when every sub-metric fails does the query fail.

use super::{persist, Ensemble, EnsembleSim, MISSING_RANK};
use crate::errors::{RelatednessError, Result};
use crate::metric::{MetricRegistry, RelatednessMetric};
use crate::types::{EnsembleConfig, KnownSim, PageId, RankedResult, RankedResultList};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Relatedness metric combining several sub-metrics
pub struct EnsembleMetric {
    name: String,
    metrics: Vec<Arc<dyn RelatednessMetric>>,
    ensemble: Box<dyn Ensemble>,
    config: EnsembleConfig,
}

impl std::fmt::Debug for EnsembleMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleMetric")
            .field("name", &self.name)
            .field("metrics", &self.metric_names())
            .field("kind", &self.ensemble.kind())
            .finish()
    }
}

impl EnsembleMetric {
    /// Combine `metrics` (in order) with `ensemble`
    pub fn new(
        name: impl Into<String>,
        metrics: Vec<Arc<dyn RelatednessMetric>>,
        ensemble: Box<dyn Ensemble>,
        config: EnsembleConfig,
    ) -> Result<Self> {
        config.validate()?;
        if metrics.is_empty() {
            return Err(RelatednessError::invalid_config(
                "an ensemble needs at least one sub-metric",
            ));
        }
        Ok(Self {
            name: name.into(),
            metrics,
            ensemble,
            config,
        })
    }

    /// Resolve `config.metrics` through `registry` and build `config.kind`
    pub fn from_config(
        name: impl Into<String>,
        registry: &MetricRegistry,
        config: EnsembleConfig,
    ) -> Result<Self> {
        let metrics = registry.resolve(&config.metrics)?;
        let ensemble = config.kind.build();
        Self::new(name, metrics, ensemble, config)
    }

    /// Names of the sub-metrics, in input order
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }

    /// The underlying combiner
    pub fn ensemble(&self) -> &dyn Ensemble {
        self.ensemble.as_ref()
    }

    /// Per-metric scores for a pair; failures become NaN
    fn sub_scores(&self, a: PageId, b: PageId) -> Result<Vec<f64>> {
        let mut failures = 0;
        let scores: Vec<f64> = self
            .metrics
            .iter()
            .map(|metric| match metric.similarity(a, b) {
                Ok(result) => result.score,
                Err(e) => {
                    warn!(metric = metric.name(), a, b, error = %e, "sub-metric similarity failed");
                    failures += 1;
                    f64::NAN
                }
            })
            .collect();
        if failures == self.metrics.len() {
            return Err(RelatednessError::all_metrics_failed(format!(
                "{} similarity({a}, {b})",
                self.name
            )));
        }
        Ok(scores)
    }

    /// Per-metric candidate lists; failures become `None`
    fn sub_lists(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<Vec<Option<RankedResultList>>> {
        let lists: Vec<Option<RankedResultList>> = self
            .metrics
            .iter()
            .map(|metric| match metric.most_similar(page, max_results, valid_ids) {
                Ok(list) => Some(list),
                Err(e) => {
                    warn!(metric = metric.name(), page, error = %e, "sub-metric most_similar failed");
                    None
                }
            })
            .collect();
        if lists.iter().all(Option::is_none) {
            return Err(RelatednessError::all_metrics_failed(format!(
                "{} most_similar({page})",
                self.name
            )));
        }
        Ok(lists)
    }

    /// Pairwise training example for one gold judgment
    pub fn similarity_example(&self, gold: &KnownSim) -> EnsembleSim {
        let mut sim = EnsembleSim::new(gold.similarity);
        for metric in &self.metrics {
            match metric.similarity(gold.page_a, gold.page_b) {
                Ok(result) => sim.add(result.score, MISSING_RANK),
                Err(e) => {
                    warn!(metric = metric.name(), error = %e, "sub-metric failed on training pair");
                    sim.add_missing();
                }
            }
        }
        sim
    }

    /// Most-similar training example: where `page_b` lands in each
    /// sub-metric's list for `page_a`
    pub fn most_similar_example(
        &self,
        gold: &KnownSim,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> EnsembleSim {
        let mut sim = EnsembleSim::new(gold.similarity);
        for metric in &self.metrics {
            let found = metric
                .most_similar(gold.page_a, self.config.training_k, valid_ids)
                .map(|list| list.index_of(gold.page_b).and_then(|pos| list.get(pos).map(|r| (pos, r.score))));
            match found {
                Ok(Some((pos, score))) => sim.add(score, pos as i32),
                Ok(None) => sim.add_missing(),
                Err(e) => {
                    warn!(metric = metric.name(), error = %e, "sub-metric failed on training query");
                    sim.add_missing();
                }
            }
        }
        sim
    }

    /// Fit the pairwise model on gold judgments
    pub fn train_similarity(&mut self, gold: &[KnownSim]) -> Result<()> {
        if gold.is_empty() {
            return Err(RelatednessError::no_training_data(format!(
                "{}: no gold-standard pairs",
                self.name
            )));
        }
        let examples: Vec<EnsembleSim> = gold
            .par_iter()
            .map(|g| self.similarity_example(g))
            .collect();
        self.ensemble.train_similarity(&examples)?;
        info!(ensemble = %self.name, pairs = gold.len(), "trained similarity");
        Ok(())
    }

    /// Fit the most-similar model on gold judgments. The candidate pool is
    /// `valid_ids` when given, otherwise the configured corpus size.
    pub fn train_most_similar(
        &mut self,
        gold: &[KnownSim],
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<()> {
        if gold.is_empty() {
            return Err(RelatednessError::no_training_data(format!(
                "{}: no gold-standard pairs",
                self.name
            )));
        }
        let examples: Vec<EnsembleSim> = gold
            .par_iter()
            .map(|g| self.most_similar_example(g, valid_ids))
            .collect();
        let pool_size = valid_ids.map_or(self.config.corpus_size, FxHashSet::len);
        self.ensemble.train_most_similar(&examples, pool_size)?;
        info!(ensemble = %self.name, pairs = gold.len(), pool_size, "trained most_similar");
        Ok(())
    }

    /// Persist under `base/<name>/`, returning that directory
    pub fn write(&self, base: &Path) -> Result<PathBuf> {
        let dir = persist::ensemble_dir(base, &self.name);
        self.ensemble.write(&dir)?;
        Ok(dir)
    }

    /// Load from `base/<name>/`
    pub fn read(&mut self, base: &Path) -> Result<()> {
        let dir = persist::ensemble_dir(base, &self.name);
        self.ensemble.read(&dir)
    }
}

impl RelatednessMetric for EnsembleMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
        let scores = self.sub_scores(a, b)?;
        let score = self.ensemble.predict_similarity(&scores)?;
        Ok(RankedResult::new(b, score))
    }

    fn most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList> {
        let candidates = max_results.saturating_mul(self.config.candidate_multiplier);
        let lists = self.sub_lists(page, candidates, valid_ids)?;
        self.ensemble
            .predict_most_similar(&lists, max_results, valid_ids.map(FxHashSet::len))
    }
}
