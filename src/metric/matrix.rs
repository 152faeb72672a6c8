//! Sparse id -> weight vectors and row-keyed sparse matrices

use crate::types::PageId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A sparse vector with ids sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    ids: Vec<PageId>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Create an empty vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unsorted pairs; repeated ids are summed
    pub fn from_pairs(mut pairs: Vec<(PageId, f32)>) -> Self {
        pairs.sort_unstable_by_key(|&(id, _)| id);
        let mut ids: Vec<PageId> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (id, value) in pairs {
            match ids.last() {
                Some(&last) if last == id => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    ids.push(id);
                    values.push(value);
                }
            }
        }
        Self { ids, values }
    }

    /// Build a 0/1 vector from a set of ids
    pub fn from_ids<I: IntoIterator<Item = PageId>>(ids: I) -> Self {
        let mut ids: Vec<PageId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let values = vec![1.0; ids.len()];
        Self { ids, values }
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the vector has no entries
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over `(id, value)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (PageId, f32)> + '_ {
        self.ids.iter().copied().zip(self.values.iter().copied())
    }

    /// Ids in ascending order
    pub fn ids(&self) -> &[PageId] {
        &self.ids
    }

    /// Value for `id`
    pub fn get(&self, id: PageId) -> Option<f32> {
        self.ids.binary_search(&id).ok().map(|i| self.values[i])
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt()
    }

    /// Dot product by merge-joining the sorted ids
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.ids.len() && j < other.ids.len() {
            match self.ids[i].cmp(&other.ids[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += f64::from(self.values[i]) * f64::from(other.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Number of ids present in both vectors
    pub fn intersection_size(&self, other: &SparseVector) -> usize {
        let (mut i, mut j, mut count) = (0, 0, 0);
        while i < self.ids.len() && j < other.ids.len() {
            match self.ids[i].cmp(&other.ids[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }
}

/// Row-keyed sparse matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: FxHashMap<PageId, SparseVector>,
}

impl SparseMatrix {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(row id, row)` pairs
    pub fn from_rows<I: IntoIterator<Item = (PageId, SparseVector)>>(rows: I) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Insert or replace a row
    pub fn insert_row(&mut self, id: PageId, row: SparseVector) {
        self.rows.insert(id, row);
    }

    /// Row for `id`
    pub fn row(&self, id: PageId) -> Option<&SparseVector> {
        self.rows.get(&id)
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Check if the matrix has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row ids, sorted
    pub fn row_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.rows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over rows in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (PageId, &SparseVector)> {
        self.rows.iter().map(|(&id, row)| (id, row))
    }

    /// Column-major copy: row `c` of the result lists every `(r, v)` with
    /// `self[r][c] == v`
    pub fn transpose(&self) -> SparseMatrix {
        let mut columns: FxHashMap<PageId, Vec<(PageId, f32)>> = FxHashMap::default();
        for (&row_id, row) in &self.rows {
            for (col_id, value) in row.iter() {
                columns.entry(col_id).or_default().push((row_id, value));
            }
        }
        SparseMatrix::from_rows(
            columns
                .into_iter()
                .map(|(id, pairs)| (id, SparseVector::from_pairs(pairs))),
        )
    }
}
