use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use linfa_nn::{LinearSearch, distance::Distance};
use ndarray::{Array2, ArrayView, Dimension};

use super::{ClusterLabel, ClusteringStrategy, DistanceMatrix, canonical_labels};

/// Density-based clustering over a precomputed distance matrix.
///
/// Rows within `eps` (inclusive) of each other are neighbours; a row with at least
/// `min_samples` neighbours, itself included, is a core row and pulls its neighbourhood
/// into its cluster. Clusters chain through core rows, so this groups topically related
/// posts more loosely than complete linkage. Rows left as noise each get their own label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanClustering {
    eps: f32,
    min_samples: usize,
}

impl DbscanClustering {
    /// Build a strategy with neighbourhood radius `eps` and core threshold `min_samples`.
    pub fn new(eps: f32, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples: min_samples.max(1),
        }
    }

    /// Neighbourhood radius.
    pub fn eps(&self) -> f32 {
        self.eps
    }
}

/// Looks distances up in the matrix; each point is a one-column row holding its index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Precomputed<'a>(&'a DistanceMatrix);

impl Distance<f32> for Precomputed<'_> {
    fn distance<D: Dimension>(&self, a: ArrayView<f32, D>, b: ArrayView<f32, D>) -> f32 {
        self.0.get(row_index(&a), row_index(&b))
    }
}

fn row_index<D: Dimension>(point: &ArrayView<f32, D>) -> usize {
    point.iter().next().map_or(0, |&value| value as usize)
}

/// Smallest radius above `eps`, so rows exactly `eps` apart still count as neighbours.
fn inclusive_radius(eps: f32) -> f32 {
    if eps.is_finite() && eps > 0.0 {
        f32::from_bits(eps.to_bits() + 1)
    } else {
        eps
    }
}

impl ClusteringStrategy for DbscanClustering {
    fn cluster(&self, distances: &DistanceMatrix) -> Vec<ClusterLabel> {
        let size = distances.len();
        if size == 0 {
            return Vec::new();
        }
        let rows = Array2::from_shape_fn((size, 1), |(row, _)| row as f32);

        // linfa needs at least two points per core; with one, a lone row comes back as
        // noise and still ends up alone, so both settings give the same partition.
        let memberships = match Dbscan::params_with(
            self.min_samples.max(2),
            Precomputed(distances),
            LinearSearch::new(),
        )
        .tolerance(inclusive_radius(self.eps))
        .transform(&rows)
        {
            Ok(memberships) => memberships,
            Err(error) => {
                tracing::error!(
                    error = ?error,
                    eps = self.eps,
                    "DBSCAN rejected its parameters; leaving rows unclustered"
                );
                return canonical_labels(&(0..size).collect::<Vec<_>>());
            }
        };

        let clusters = memberships.iter().flatten().max().map_or(0, |max| max + 1);
        let mut noise = 0;
        let raw: Vec<usize> = memberships
            .iter()
            .map(|&label| {
                label.unwrap_or_else(|| {
                    noise += 1;
                    clusters + noise
                })
            })
            .collect();
        if noise > 0 {
            tracing::debug!(noise, "DBSCAN left rows unclustered; emitting them as singletons");
        }
        canonical_labels(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f32>>) -> DistanceMatrix {
        DistanceMatrix::from_rows(rows).expect("valid matrix")
    }

    fn labels(values: &[usize]) -> Vec<ClusterLabel> {
        values.iter().copied().map(ClusterLabel).collect()
    }

    #[test]
    fn single_row_gets_single_label() {
        let strategy = DbscanClustering::new(0.17, 1);
        assert_eq!(strategy.cluster(&matrix(vec![vec![0.0]])), labels(&[0]));
    }

    #[test]
    fn chains_through_close_neighbours() {
        // 0-2 are far apart but linked through 1, unlike complete linkage.
        let strategy = DbscanClustering::new(0.17, 1);
        let distances = matrix(vec![
            vec![0.0, 0.1, 0.3, 0.9],
            vec![0.1, 0.0, 0.15, 0.9],
            vec![0.3, 0.15, 0.0, 0.9],
            vec![0.9, 0.9, 0.9, 0.0],
        ]);
        assert_eq!(strategy.cluster(&distances), labels(&[0, 0, 0, 1]));
    }

    #[test]
    fn eps_is_inclusive() {
        let strategy = DbscanClustering::new(0.17, 1);
        let distances = matrix(vec![vec![0.0, 0.17], vec![0.17, 0.0]]);
        assert_eq!(strategy.cluster(&distances), labels(&[0, 0]));
    }

    #[test]
    fn min_samples_one_leaves_no_noise() {
        let strategy = DbscanClustering::new(0.05, 1);
        let distances = matrix(vec![
            vec![0.0, 0.5, 0.5],
            vec![0.5, 0.0, 0.5],
            vec![0.5, 0.5, 0.0],
        ]);
        assert_eq!(strategy.cluster(&distances), labels(&[0, 1, 2]));
    }

    #[test]
    fn noise_rows_never_share_a_label() {
        let strategy = DbscanClustering::new(0.1, 3);
        let distances = matrix(vec![
            vec![0.0, 0.05, 0.05, 0.9, 0.9],
            vec![0.05, 0.0, 0.05, 0.9, 0.9],
            vec![0.05, 0.05, 0.0, 0.9, 0.9],
            vec![0.9, 0.9, 0.9, 0.0, 0.9],
            vec![0.9, 0.9, 0.9, 0.9, 0.0],
        ]);
        assert_eq!(strategy.cluster(&distances), labels(&[0, 0, 0, 1, 2]));
    }

    #[test]
    fn empty_matrix_yields_no_labels() {
        let strategy = DbscanClustering::new(0.17, 1);
        assert!(strategy.cluster(&matrix(Vec::new())).is_empty());
    }

    #[test]
    fn non_positive_eps_leaves_every_row_alone() {
        let strategy = DbscanClustering::new(0.0, 1);
        let distances = matrix(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(strategy.cluster(&distances), labels(&[0, 1]));
    }
}
