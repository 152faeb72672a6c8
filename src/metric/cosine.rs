//! Cosine similarity over sparse feature vectors
//!
//! Row norms and the transposed matrix are computed once when the feature
//! matrix is loaded. `most_similar` walks only the columns present in the
//! query vector and accumulates dot products in a sparse map.

use super::matrix::SparseMatrix;
use super::RelatednessMetric;
use crate::errors::Result;
use crate::leaderboard::Leaderboard;
use crate::types::{PageId, RankedResult, RankedResultList};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Cosine similarity metric
#[derive(Debug)]
pub struct CosineSimilarity {
    name: String,
    matrix: SparseMatrix,
    transpose: SparseMatrix,
    norms: FxHashMap<PageId, f64>,
}

impl CosineSimilarity {
    /// Load a feature matrix (one row per page)
    pub fn new(matrix: SparseMatrix) -> Self {
        let transpose = matrix.transpose();
        let rows: Vec<_> = matrix.iter().collect();
        let norms: FxHashMap<PageId, f64> = rows
            .par_iter()
            .map(|&(id, row)| (id, row.norm()))
            .collect();
        debug!(
            rows = matrix.num_rows(),
            columns = transpose.num_rows(),
            "loaded cosine feature matrix"
        );
        Self {
            name: "cosine".to_string(),
            matrix,
            transpose,
            norms,
        }
    }

    /// Register under a different name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The loaded feature matrix
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    fn norm(&self, id: PageId) -> f64 {
        self.norms.get(&id).copied().unwrap_or(0.0)
    }
}

impl RelatednessMetric for CosineSimilarity {
    fn name(&self) -> &str {
        &self.name
    }

    /// NaN when either page has no (or an all-zero) feature vector
    fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
        let (Some(va), Some(vb)) = (self.matrix.row(a), self.matrix.row(b)) else {
            return Ok(RankedResult::new(b, f64::NAN));
        };
        let denominator = self.norm(a) * self.norm(b);
        if denominator == 0.0 {
            return Ok(RankedResult::new(b, f64::NAN));
        }
        Ok(RankedResult::new(b, va.dot(vb) / denominator))
    }

    fn most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList> {
        let Some(query) = self.matrix.row(page) else {
            return Ok(RankedResultList::new(max_results));
        };
        let query_norm = self.norm(page);
        if query_norm == 0.0 {
            return Ok(RankedResultList::new(max_results));
        }

        let mut dots: FxHashMap<PageId, f64> = FxHashMap::default();
        for (feature, weight) in query.iter() {
            let Some(column) = self.transpose.row(feature) else {
                continue;
            };
            for (candidate, value) in column.iter() {
                if candidate == page || valid_ids.is_some_and(|v| !v.contains(&candidate)) {
                    continue;
                }
                *dots.entry(candidate).or_insert(0.0) += f64::from(weight) * f64::from(value);
            }
        }

        let mut board = Leaderboard::new(max_results);
        for (candidate, dot) in dots {
            let norm = self.norm(candidate);
            if norm > 0.0 {
                board.tally(candidate, dot / (query_norm * norm));
            }
        }
        Ok(board.top())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::matrix::SparseVector;

    fn metric() -> CosineSimilarity {
        CosineSimilarity::new(SparseMatrix::from_rows(vec![
            (1, SparseVector::from_pairs(vec![(100, 1.0), (101, 1.0)])),
            (2, SparseVector::from_pairs(vec![(100, 1.0), (101, 1.0)])),
            (3, SparseVector::from_pairs(vec![(100, 1.0), (102, 1.0)])),
            (4, SparseVector::from_pairs(vec![(103, 2.0)])),
        ]))
    }

    #[test]
    fn test_similarity() {
        let m = metric();
        assert!((m.similarity(1, 2).unwrap().score - 1.0).abs() < 1e-12);
        assert!((m.similarity(1, 3).unwrap().score - 0.5).abs() < 1e-12);
        assert_eq!(m.similarity(1, 4).unwrap().score, 0.0);
        assert!(m.similarity(1, 99).unwrap().score.is_nan());
        assert_eq!(m.similarity(1, 3).unwrap().id, 3);
    }

    #[test]
    fn test_most_similar() {
        let m = metric();
        let top = m.most_similar(1, 10, None).unwrap();
        assert_eq!(top.ids(), vec![2, 3]);
        assert!((top.get(1).unwrap().score - 0.5).abs() < 1e-12);

        let valid: FxHashSet<PageId> = [3].into_iter().collect();
        let top = m.most_similar(1, 10, Some(&valid)).unwrap();
        assert_eq!(top.ids(), vec![3]);

        assert!(m.most_similar(99, 5, None).unwrap().is_empty());
        assert_eq!(m.most_similar(1, 1, None).unwrap().len(), 1);
    }

    #[test]
    fn test_agrees_with_pairwise() {
        let m = metric();
        for result in m.most_similar(3, 10, None).unwrap().iter() {
            let pairwise = m.similarity(3, result.id).unwrap().score;
            assert!((pairwise - result.score).abs() < 1e-12);
        }
    }
}
