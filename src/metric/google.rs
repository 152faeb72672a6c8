//! Link-overlap ("Google") similarity
//!
//! Milne & Witten's adaptation of the normalized Google distance: two pages
//! are related when the sets of pages linking to them overlap more than the
//! corpus size would predict.
//!
//! ```text
//! distance = (ln max(|A|,|B|) - ln |A∩B|) / (ln N - ln min(|A|,|B|))
//! similarity = clamp(1 - distance, 0, 1)
//! ```

use super::matrix::SparseMatrix;
use super::RelatednessMetric;
use crate::errors::Result;
use crate::leaderboard::Leaderboard;
use crate::types::{PageId, RankedResult, RankedResultList};
use rustc_hash::{FxHashMap, FxHashSet};

/// Similarity from set sizes; NaN when either set is empty
pub fn google_similarity(
    size_a: usize,
    size_b: usize,
    intersection: usize,
    corpus_size: usize,
) -> f64 {
    if size_a == 0 || size_b == 0 {
        return f64::NAN;
    }
    if intersection == 0 {
        return 0.0;
    }
    let larger = size_a.max(size_b) as f64;
    let smaller = size_a.min(size_b) as f64;
    // The corpus must be strictly larger than any link set.
    let corpus = (corpus_size as f64).max(larger + 1.0);
    let distance = (larger.ln() - (intersection as f64).ln()) / (corpus.ln() - smaller.ln());
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Link-overlap metric over a page -> linking-pages matrix
#[derive(Debug)]
pub struct GoogleSimilarity {
    name: String,
    links: SparseMatrix,
    transpose: SparseMatrix,
    corpus_size: usize,
}

impl GoogleSimilarity {
    /// Load a link matrix. `corpus_size` of zero uses the number of rows.
    pub fn new(links: SparseMatrix, corpus_size: usize) -> Self {
        let corpus_size = if corpus_size == 0 {
            links.num_rows()
        } else {
            corpus_size
        };
        let transpose = links.transpose();
        Self {
            name: "google".to_string(),
            links,
            transpose,
            corpus_size,
        }
    }

    /// Register under a different name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Corpus size used in the distance denominator
    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }

    fn link_count(&self, id: PageId) -> usize {
        self.links.row(id).map_or(0, |row| row.len())
    }
}

impl RelatednessMetric for GoogleSimilarity {
    fn name(&self) -> &str {
        &self.name
    }

    fn similarity(&self, a: PageId, b: PageId) -> Result<RankedResult> {
        let (Some(la), Some(lb)) = (self.links.row(a), self.links.row(b)) else {
            return Ok(RankedResult::new(b, f64::NAN));
        };
        let score = google_similarity(la.len(), lb.len(), la.intersection_size(lb), self.corpus_size);
        Ok(RankedResult::new(b, score))
    }

    fn most_similar(
        &self,
        page: PageId,
        max_results: usize,
        valid_ids: Option<&FxHashSet<PageId>>,
    ) -> Result<RankedResultList> {
        let Some(query) = self.links.row(page) else {
            return Ok(RankedResultList::new(max_results));
        };

        let mut overlap: FxHashMap<PageId, usize> = FxHashMap::default();
        for linker in query.ids() {
            let Some(targets) = self.transpose.row(*linker) else {
                continue;
            };
            for &candidate in targets.ids() {
                if candidate == page || valid_ids.is_some_and(|v| !v.contains(&candidate)) {
                    continue;
                }
                *overlap.entry(candidate).or_insert(0) += 1;
            }
        }

        let mut board = Leaderboard::new(max_results);
        for (candidate, shared) in overlap {
            let score = google_similarity(
                query.len(),
                self.link_count(candidate),
                shared,
                self.corpus_size,
            );
            board.tally(candidate, score);
        }
        Ok(board.top())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::matrix::SparseVector;

    fn metric() -> GoogleSimilarity {
        // Rows: page -> pages linking to it.
        GoogleSimilarity::new(
            SparseMatrix::from_rows(vec![
                (1, SparseVector::from_ids([10, 11, 12, 13])),
                (2, SparseVector::from_ids([10, 11, 12, 13])),
                (3, SparseVector::from_ids([10, 20, 21, 22])),
                (4, SparseVector::from_ids([30])),
            ]),
            1000,
        )
    }

    #[test]
    fn test_formula() {
        assert_eq!(google_similarity(4, 4, 4, 1000), 1.0);
        assert_eq!(google_similarity(4, 4, 0, 1000), 0.0);
        assert!(google_similarity(0, 4, 0, 1000).is_nan());
        let partial = google_similarity(4, 4, 1, 1000);
        assert!(partial > 0.0 && partial < 1.0);
        // More overlap, more similar.
        assert!(google_similarity(4, 4, 2, 1000) > partial);
    }

    #[test]
    fn test_similarity() {
        let m = metric();
        assert_eq!(m.similarity(1, 2).unwrap().score, 1.0);
        assert_eq!(m.similarity(1, 4).unwrap().score, 0.0);
        assert!(m.similarity(1, 99).unwrap().score.is_nan());
    }

    #[test]
    fn test_most_similar_matches_pairwise() {
        let m = metric();
        let top = m.most_similar(1, 5, None).unwrap();
        assert_eq!(top.ids(), vec![2, 3]);
        for result in top.iter() {
            assert_eq!(result.score, m.similarity(1, result.id).unwrap().score);
        }
    }

    #[test]
    fn test_corpus_defaults_to_rows() {
        let m = GoogleSimilarity::new(SparseMatrix::from_rows(vec![(1, SparseVector::from_ids([2]))]), 0);
        assert_eq!(m.corpus_size(), 1);
    }
}
