//! Pairwise cosine distances and the clustering strategies that consume them.
//!
//! Strategies see only a [`DistanceMatrix`] and return one [`ClusterLabel`] per row. Label
//! values carry no meaning beyond equality within a single call; both built-in strategies
//! number clusters by first appearance in row order so equal input yields equal output.

mod agglomerative;
mod dbscan;

pub use agglomerative::AgglomerativeClustering;
pub use dbscan::DbscanClustering;

use std::collections::HashMap;
use thiserror::Error;

/// Opaque group identifier assigned to one row of a distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterLabel(pub usize);

/// Algorithm turning pairwise distances into group labels.
pub trait ClusteringStrategy: Send + Sync {
    /// Assign a label to every row of `distances`.
    fn cluster(&self, distances: &DistanceMatrix) -> Vec<ClusterLabel>;
}

/// Thresholds for the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringSettings {
    /// Complete-linkage distance at or above which clusters stay apart.
    pub agglomerative_distance_threshold: f32,
    /// DBSCAN neighbourhood radius.
    pub dbscan_eps: f32,
    /// Neighbours (including the point itself) required for a DBSCAN core point.
    pub dbscan_min_samples: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            agglomerative_distance_threshold: 0.17,
            dbscan_eps: 0.17,
            dbscan_min_samples: 1,
        }
    }
}

/// Errors raised when building a distance matrix from raw rows.
#[derive(Debug, Error, PartialEq)]
pub enum DistanceMatrixError {
    /// A row length did not match the number of rows.
    #[error("Distance matrix must be square: row {row} has {len} entries, expected {expected}")]
    NotSquare {
        /// Offending row index.
        row: usize,
        /// Length of that row.
        len: usize,
        /// Number of rows in the matrix.
        expected: usize,
    },
    /// A distance was negative or not a number.
    #[error("Invalid distance {value} at ({row}, {column})")]
    InvalidDistance {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Offending value.
        value: f32,
    },
    /// `d(i, j)` differed from `d(j, i)`.
    #[error("Distance matrix is not symmetric at ({row}, {column})")]
    NotSymmetric {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
    },
}

/// Square, symmetric matrix of non-negative pairwise distances.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// Pairwise cosine distances between `embeddings`, which must share one dimension.
    pub fn from_embeddings(embeddings: &[Vec<f32>]) -> Self {
        let size = embeddings.len();
        let norms: Vec<f32> = embeddings.iter().map(|vector| norm(vector)).collect();
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                debug_assert_eq!(embeddings[i].len(), embeddings[j].len());
                let distance =
                    cosine_distance_with_norms(&embeddings[i], &embeddings[j], norms[i], norms[j]);
                values[i * size + j] = distance;
                values[j * size + i] = distance;
            }
        }
        Self { size, values }
    }

    /// Validate and wrap precomputed distances.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, DistanceMatrixError> {
        let size = rows.len();
        if let Some((row, entries)) = rows
            .iter()
            .enumerate()
            .find(|(_, entries)| entries.len() != size)
        {
            return Err(DistanceMatrixError::NotSquare {
                row,
                len: entries.len(),
                expected: size,
            });
        }

        let mut values = Vec::with_capacity(size * size);
        for (row, entries) in rows.iter().enumerate() {
            for (column, &value) in entries.iter().enumerate() {
                if value.is_nan() || value < 0.0 {
                    return Err(DistanceMatrixError::InvalidDistance { row, column, value });
                }
                if (value - rows[column][row]).abs() > 1e-6 {
                    return Err(DistanceMatrixError::NotSymmetric { row, column });
                }
            }
            values.extend_from_slice(entries);
        }
        Ok(Self { size, values })
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Upper triangle in row-major order, the layout hierarchical clustering expects.
    pub fn condensed(&self) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.size * self.size.saturating_sub(1) / 2);
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                values.push(self.get(i, j));
            }
        }
        values
    }

    /// Distance between rows `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.size + j]
    }
}

/// Cosine distance `1 - cos(a, b)`, clamped to `[0, 2]`; zero vectors have similarity 0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    cosine_distance_with_norms(a, b, norm(a), norm(b))
}

fn cosine_distance_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

/// Renumber raw cluster ids so the first row gets label 0, the next new id label 1, and so on.
pub(crate) fn canonical_labels(raw: &[usize]) -> Vec<ClusterLabel> {
    let mut mapping = HashMap::new();
    raw.iter()
        .map(|id| {
            let next = mapping.len();
            ClusterLabel(*mapping.entry(*id).or_insert(next))
        })
        .collect()
}
